//! CPU reference backend
//!
//! Host-memory execution with scalar kernels for every [`Op`]. All tensors
//! are stored as `f32` regardless of their declared dtype; memory accounting
//! uses the declared dtype so byte counts match what a device would allocate.

use std::collections::HashMap;

use crate::backend::{
    BackendError, BackendFactory, BackendResult, Device, ExecutionBackend,
};
use crate::program::{Op, TensorDesc, TensorId};

#[derive(Debug, Default)]
pub struct CpuBackend {
    tensors: HashMap<TensorId, (TensorDesc, Vec<f32>)>,
    /// Optional cap on live bytes; allocations past it fail with OutOfMemory
    memory_limit: Option<usize>,
    allocated_bytes: usize,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_limit(limit_bytes: usize) -> Self {
        Self {
            memory_limit: Some(limit_bytes),
            ..Self::default()
        }
    }

    pub fn buffer(&self, id: TensorId) -> Option<&[f32]> {
        self.tensors.get(&id).map(|(_, buf)| buf.as_slice())
    }

    fn desc(&self, id: TensorId) -> BackendResult<&TensorDesc> {
        self.tensors
            .get(&id)
            .map(|(desc, _)| desc)
            .ok_or(BackendError::TensorNotFound(id))
    }

    fn input(&self, id: TensorId) -> BackendResult<Vec<f32>> {
        // Clone input to avoid borrow issues with the output buffer
        self.tensors
            .get(&id)
            .map(|(_, buf)| buf.clone())
            .ok_or(BackendError::TensorNotFound(id))
    }

    fn output(&mut self, id: TensorId) -> BackendResult<&mut Vec<f32>> {
        self.tensors
            .get_mut(&id)
            .map(|(_, buf)| buf)
            .ok_or(BackendError::TensorNotFound(id))
    }

    fn unary(
        &mut self,
        input_id: TensorId,
        output_id: TensorId,
        f: impl Fn(f32) -> f32,
    ) -> BackendResult<()> {
        let input = self.input(input_id)?;
        let out = self.output(output_id)?;
        if input.len() != out.len() {
            return Err(BackendError::InvalidShape(format!(
                "Input and output buffers must have same size: {} vs {}",
                input.len(),
                out.len()
            )));
        }
        for (o, &x) in out.iter_mut().zip(input.iter()) {
            *o = f(x);
        }
        Ok(())
    }

    /// C = A + B, where B is broadcast over A when its length divides A's
    fn add(&mut self, a_id: TensorId, b_id: TensorId, c_id: TensorId) -> BackendResult<()> {
        let a = self.input(a_id)?;
        let b = self.input(b_id)?;
        let c = self.output(c_id)?;

        if a.len() != c.len() || b.is_empty() || a.len() % b.len() != 0 {
            return Err(BackendError::InvalidShape(format!(
                "Add buffers incompatible: {} + {} -> {}",
                a.len(),
                b.len(),
                c.len()
            )));
        }

        for (i, (o, &x)) in c.iter_mut().zip(a.iter()).enumerate() {
            *o = x + b[i % b.len()];
        }
        Ok(())
    }

    fn matmul(&mut self, a_id: TensorId, b_id: TensorId, c_id: TensorId) -> BackendResult<()> {
        let (m, k, n) = {
            let a_d = self.desc(a_id)?;
            let b_d = self.desc(b_id)?;
            let c_d = self.desc(c_id)?;
            if a_d.shape.len() != 2 || b_d.shape.len() != 2 {
                return Err(BackendError::InvalidShape(format!(
                    "MatMul expects 2-D operands, got {:?} and {:?}",
                    a_d.shape, b_d.shape
                )));
            }
            let (m, k, n) = (a_d.shape[0], a_d.shape[1], b_d.shape[1]);
            if b_d.shape[0] != k || c_d.shape != [m, n] {
                return Err(BackendError::InvalidShape(format!(
                    "MatMul shapes do not line up: {:?} x {:?} -> {:?}",
                    a_d.shape, b_d.shape, c_d.shape
                )));
            }
            (m, k, n)
        };

        let a = self.input(a_id)?;
        let b = self.input(b_id)?;
        let c = self.output(c_id)?;

        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for kk in 0..k {
                    sum += a[i * k + kk] * b[kk * n + j];
                }
                c[i * n + j] = sum;
            }
        }
        Ok(())
    }

    /// Row-wise softmax over the last dimension
    fn softmax(&mut self, input_id: TensorId, output_id: TensorId) -> BackendResult<()> {
        let cols = self.desc(input_id)?.shape.last().copied().unwrap_or(1).max(1);
        let input = self.input(input_id)?;
        let out = self.output(output_id)?;

        if input.len() != out.len() {
            return Err(BackendError::InvalidShape(format!(
                "Softmax buffers must have same size: {} vs {}",
                input.len(),
                out.len()
            )));
        }

        for (row_in, row_out) in input.chunks(cols).zip(out.chunks_mut(cols)) {
            let max_val = row_in.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let exp_sum: f32 = row_in.iter().map(|&x| (x - max_val).exp()).sum();
            let inv_sum = if exp_sum > 0.0 { 1.0 / exp_sum } else { 1.0 };
            for (o, &x) in row_out.iter_mut().zip(row_in.iter()) {
                *o = (x - max_val).exp() * inv_sum;
            }
        }
        Ok(())
    }

    /// NCHW input, OIHW filter
    fn conv2d(
        &mut self,
        x_id: TensorId,
        w_id: TensorId,
        y_id: TensorId,
        stride: usize,
        padding: usize,
    ) -> BackendResult<()> {
        let stride = stride.max(1);
        let (xs, ws, ys) = (
            self.desc(x_id)?.shape.clone(),
            self.desc(w_id)?.shape.clone(),
            self.desc(y_id)?.shape.clone(),
        );
        if xs.len() != 4 || ws.len() != 4 || ys.len() != 4 || xs[1] != ws[1] {
            return Err(BackendError::InvalidShape(format!(
                "Conv2d expects NCHW input and OIHW filter with matching channels, got {:?} and {:?}",
                xs, ws
            )));
        }

        let (n, c, h, w) = (xs[0], xs[1], xs[2], xs[3]);
        let (o, kh, kw) = (ws[0], ws[2], ws[3]);
        if h + 2 * padding < kh || w + 2 * padding < kw {
            return Err(BackendError::InvalidShape(format!(
                "Conv2d filter {}x{} larger than padded input {}x{}",
                kh,
                kw,
                h + 2 * padding,
                w + 2 * padding
            )));
        }
        let oh = (h + 2 * padding - kh) / stride + 1;
        let ow = (w + 2 * padding - kw) / stride + 1;
        if ys != [n, o, oh, ow] {
            return Err(BackendError::InvalidShape(format!(
                "Conv2d output shape {:?} does not match expected {:?}",
                ys,
                [n, o, oh, ow]
            )));
        }

        let x = self.input(x_id)?;
        let wt = self.input(w_id)?;
        let y = self.output(y_id)?;

        for b in 0..n {
            for oc in 0..o {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut sum = 0.0f32;
                        for ic in 0..c {
                            for ky in 0..kh {
                                let iy = (oy * stride + ky) as isize - padding as isize;
                                if iy < 0 || iy >= h as isize {
                                    continue;
                                }
                                for kx in 0..kw {
                                    let ix = (ox * stride + kx) as isize - padding as isize;
                                    if ix < 0 || ix >= w as isize {
                                        continue;
                                    }
                                    let xi = ((b * c + ic) * h + iy as usize) * w + ix as usize;
                                    let wi = ((oc * c + ic) * kh + ky) * kw + kx;
                                    sum += x[xi] * wt[wi];
                                }
                            }
                        }
                        y[((b * o + oc) * oh + oy) * ow + ox] = sum;
                    }
                }
            }
        }
        Ok(())
    }
}

impl ExecutionBackend for CpuBackend {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn alloc(&mut self, desc: &TensorDesc) -> BackendResult<()> {
        let size = desc.byte_size();
        let previous = self
            .tensors
            .get(&desc.id)
            .map(|(d, _)| d.byte_size())
            .unwrap_or(0);
        let projected = self.allocated_bytes - previous + size;

        if let Some(limit) = self.memory_limit {
            if projected > limit {
                return Err(BackendError::OutOfMemory {
                    requested: size,
                    available: limit.saturating_sub(self.allocated_bytes - previous),
                });
            }
        }

        let buffer = vec![0.0; desc.element_count()];
        self.tensors.insert(desc.id, (desc.clone(), buffer));
        self.allocated_bytes = projected;
        Ok(())
    }

    fn free(&mut self, id: TensorId) -> BackendResult<()> {
        let (desc, _) = self
            .tensors
            .remove(&id)
            .ok_or(BackendError::TensorNotFound(id))?;
        self.allocated_bytes -= desc.byte_size();
        Ok(())
    }

    fn execute_op(
        &mut self,
        op: &Op,
        inputs: &[TensorId],
        outputs: &[TensorId],
    ) -> BackendResult<()> {
        let (n_in, n_out) = op.arity();
        if inputs.len() < n_in || outputs.len() < n_out {
            return Err(BackendError::InvalidShape(format!(
                "{} requires {} inputs and {} outputs, got {} inputs and {} outputs",
                op.name(),
                n_in,
                n_out,
                inputs.len(),
                outputs.len()
            )));
        }

        match op {
            Op::FillConstant { value } => {
                self.output(outputs[0])?.fill(*value);
                Ok(())
            }
            Op::Abs => self.unary(inputs[0], outputs[0], f32::abs),
            Op::Relu => self.unary(inputs[0], outputs[0], |x| x.max(0.0)),
            Op::Scale { factor } => {
                let factor = *factor;
                self.unary(inputs[0], outputs[0], move |x| x * factor)
            }
            Op::Assign => self.unary(inputs[0], outputs[0], |x| x),
            Op::Reshape2 => {
                let from = self.desc(inputs[0])?.element_count();
                let to = self.desc(outputs[0])?.element_count();
                if from != to {
                    return Err(BackendError::InvalidShape(format!(
                        "reshape2 cannot change element count: {} -> {}",
                        from, to
                    )));
                }
                self.unary(inputs[0], outputs[0], |x| x)
            }
            Op::ElementwiseAdd => self.add(inputs[0], inputs[1], outputs[0]),
            Op::MatMul => self.matmul(inputs[0], inputs[1], outputs[0]),
            Op::Softmax => self.softmax(inputs[0], outputs[0]),
            Op::Conv2d { stride, padding } => {
                self.conv2d(inputs[0], inputs[1], outputs[0], *stride, *padding)
            }
        }
    }

    fn synchronize(&mut self) -> BackendResult<()> {
        // CPU backend is synchronous, nothing to synchronize
        Ok(())
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    fn live_tensors(&self) -> usize {
        self.tensors.len()
    }
}

/// Hands out a fresh [`CpuBackend`] per profiling call
#[derive(Debug, Clone, Default)]
pub struct CpuBackendFactory {
    memory_limit: Option<usize>,
}

impl CpuBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory_limit(limit_bytes: usize) -> Self {
        Self {
            memory_limit: Some(limit_bytes),
        }
    }
}

impl BackendFactory for CpuBackendFactory {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn create(&self) -> BackendResult<Box<dyn ExecutionBackend>> {
        let backend = match self.memory_limit {
            Some(limit) => CpuBackend::with_memory_limit(limit),
            None => CpuBackend::new(),
        };
        Ok(Box::new(backend))
    }
}
