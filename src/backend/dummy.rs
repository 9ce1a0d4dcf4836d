//! Dummy backend for testing (llama.cpp pattern).
//!
//! Host-only, no real memory and no real kernels. Useful for exercising the
//! profiler without depending on kernel speed:
//!
//! - **Fake memory**: allocations are offsets into a fake address space
//! - **Simulated latency**: every op sleeps for a fixed duration
//! - **Failure injection**: a named op can be made to fail
//! - **Shared statistics**: alloc/free/execute counts survive the backend
//!   being dropped, so tests can verify that everything was released
//!
//! # Usage
//!
//! ```rust,ignore
//! use costforge::backend::{DummyBackendFactory, Device};
//!
//! let factory = DummyBackendFactory::new(Device::Cpu)
//!     .with_op_latency(Duration::from_millis(2));
//! let stats = factory.stats();
//! // ... profile with the factory registered ...
//! assert_eq!(stats.lock().unwrap().live_allocations(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{BackendError, BackendFactory, BackendResult, Device, ExecutionBackend};
use crate::program::{Op, TensorDesc, TensorId};

/// Fake buffer: an offset into the dummy address space
#[derive(Debug, Clone)]
pub struct DummyBuffer {
    pub offset: usize,
    pub size: usize,
}

/// Statistics tracking for dummy backends (llama.cpp pattern)
#[derive(Debug, Default, Clone)]
pub struct DummyBackendStats {
    /// Number of alloc() calls
    pub alloc_count: usize,
    /// Number of free() calls
    pub free_count: usize,
    /// Number of execute_op() calls
    pub execute_op_count: usize,
    /// Number of synchronize() calls
    pub synchronize_count: usize,
    /// Highest number of bytes live at once
    pub peak_allocated_bytes: usize,
    /// Op names in execution order
    pub executed_ops: Vec<String>,
}

impl DummyBackendStats {
    pub fn live_allocations(&self) -> usize {
        self.alloc_count - self.free_count
    }
}

#[derive(Debug)]
pub struct DummyBackend {
    device: Device,
    buffers: HashMap<TensorId, DummyBuffer>,
    current_offset: usize,
    allocated_bytes: usize,
    /// Alignment requirement (llama.cpp uses 8)
    alignment: usize,
    op_latency: Duration,
    fail_on_op: Option<String>,
    stats: Arc<Mutex<DummyBackendStats>>,
}

impl DummyBackend {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            buffers: HashMap::new(),
            current_offset: 0,
            allocated_bytes: 0,
            alignment: 8,
            op_latency: Duration::ZERO,
            fail_on_op: None,
            stats: Arc::new(Mutex::new(DummyBackendStats::default())),
        }
    }

    pub fn with_op_latency(mut self, latency: Duration) -> Self {
        self.op_latency = latency;
        self
    }

    /// Make every execution of the named op fail
    pub fn with_failing_op(mut self, op_name: impl Into<String>) -> Self {
        self.fail_on_op = Some(op_name.into());
        self
    }

    fn with_stats(mut self, stats: Arc<Mutex<DummyBackendStats>>) -> Self {
        self.stats = stats;
        self
    }

    /// Snapshot of the statistics
    pub fn stats(&self) -> DummyBackendStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn has_buffer(&self, id: TensorId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn current_offset(&self) -> usize {
        self.current_offset
    }

    /// Align offset to alignment boundary (llama.cpp pattern)
    fn align_offset(&self, offset: usize) -> usize {
        offset.div_ceil(self.alignment) * self.alignment
    }

    fn update_stats(&self, f: impl FnOnce(&mut DummyBackendStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

impl ExecutionBackend for DummyBackend {
    fn device(&self) -> Device {
        self.device
    }

    fn alloc(&mut self, desc: &TensorDesc) -> BackendResult<()> {
        let size = desc.byte_size();
        let aligned_offset = self.align_offset(self.current_offset);

        if let Some(old) = self
            .buffers
            .insert(desc.id, DummyBuffer { offset: aligned_offset, size })
        {
            self.allocated_bytes -= old.size;
        } else {
            self.update_stats(|s| s.alloc_count += 1);
        }
        self.current_offset = aligned_offset + size;
        self.allocated_bytes += size;

        let live = self.allocated_bytes;
        self.update_stats(|s| s.peak_allocated_bytes = s.peak_allocated_bytes.max(live));
        Ok(())
    }

    fn free(&mut self, id: TensorId) -> BackendResult<()> {
        let buffer = self
            .buffers
            .remove(&id)
            .ok_or(BackendError::TensorNotFound(id))?;
        self.allocated_bytes -= buffer.size;
        self.update_stats(|s| s.free_count += 1);
        Ok(())
    }

    fn execute_op(
        &mut self,
        op: &Op,
        inputs: &[TensorId],
        outputs: &[TensorId],
    ) -> BackendResult<()> {
        for id in inputs.iter().chain(outputs.iter()) {
            if !self.buffers.contains_key(id) {
                return Err(BackendError::TensorNotFound(*id));
            }
        }

        self.update_stats(|s| {
            s.execute_op_count += 1;
            s.executed_ops.push(op.name().to_string());
        });

        if self.fail_on_op.as_deref() == Some(op.name()) {
            return Err(BackendError::Kernel(format!("injected failure in {}", op.name())));
        }

        if !self.op_latency.is_zero() {
            std::thread::sleep(self.op_latency);
        }
        Ok(())
    }

    fn synchronize(&mut self) -> BackendResult<()> {
        self.update_stats(|s| s.synchronize_count += 1);
        Ok(())
    }

    fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    fn live_tensors(&self) -> usize {
        self.buffers.len()
    }
}

/// Factory producing dummy backends that share one statistics record
#[derive(Debug, Clone)]
pub struct DummyBackendFactory {
    device: Device,
    exclusive: bool,
    op_latency: Duration,
    fail_on_op: Option<String>,
    stats: Arc<Mutex<DummyBackendStats>>,
}

impl DummyBackendFactory {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            exclusive: device == Device::Gpu,
            op_latency: Duration::ZERO,
            fail_on_op: None,
            stats: Arc::new(Mutex::new(DummyBackendStats::default())),
        }
    }

    pub fn with_op_latency(mut self, latency: Duration) -> Self {
        self.op_latency = latency;
        self
    }

    pub fn with_failing_op(mut self, op_name: impl Into<String>) -> Self {
        self.fail_on_op = Some(op_name.into());
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Handle on the statistics shared by every backend this factory creates
    pub fn stats(&self) -> Arc<Mutex<DummyBackendStats>> {
        Arc::clone(&self.stats)
    }
}

impl BackendFactory for DummyBackendFactory {
    fn device(&self) -> Device {
        self.device
    }

    fn exclusive(&self) -> bool {
        self.exclusive
    }

    fn create(&self) -> BackendResult<Box<dyn ExecutionBackend>> {
        let mut backend = DummyBackend::new(self.device)
            .with_op_latency(self.op_latency)
            .with_stats(Arc::clone(&self.stats));
        if let Some(name) = &self.fail_on_op {
            backend = backend.with_failing_op(name.clone());
        }
        Ok(Box::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(id: usize, shape: Vec<usize>) -> TensorDesc {
        let mut desc = TensorDesc::f32(format!("t{}", id), shape);
        desc.id = TensorId(id);
        desc
    }

    #[test]
    fn test_dummy_backend_alloc() {
        let mut backend = DummyBackend::new(Device::Cpu);
        backend.alloc(&desc(0, vec![4])).expect("Alloc should succeed");

        assert!(backend.has_buffer(TensorId(0)));
        assert_eq!(backend.stats().alloc_count, 1);
        assert_eq!(backend.allocated_bytes(), 16);
    }

    #[test]
    fn test_dummy_backend_alignment() {
        let mut backend = DummyBackend::new(Device::Cpu);

        // 5 floats = 20 bytes, next allocation starts at 24
        backend.alloc(&desc(0, vec![5])).unwrap();
        backend.alloc(&desc(1, vec![4])).unwrap();

        assert_eq!(backend.current_offset(), 40);
        assert_eq!(backend.stats().peak_allocated_bytes, 36);
    }

    #[test]
    fn test_dummy_backend_free() {
        let mut backend = DummyBackend::new(Device::Cpu);
        backend.alloc(&desc(0, vec![4])).unwrap();
        backend.free(TensorId(0)).unwrap();

        assert!(!backend.has_buffer(TensorId(0)));
        assert_eq!(backend.stats().live_allocations(), 0);
        assert!(matches!(
            backend.free(TensorId(0)),
            Err(BackendError::TensorNotFound(_))
        ));
    }

    #[test]
    fn test_dummy_backend_failure_injection() {
        let mut backend = DummyBackend::new(Device::Cpu).with_failing_op("relu");
        backend.alloc(&desc(0, vec![4])).unwrap();
        backend.alloc(&desc(1, vec![4])).unwrap();

        assert!(backend.execute_op(&Op::Abs, &[TensorId(0)], &[TensorId(1)]).is_ok());
        let err = backend
            .execute_op(&Op::Relu, &[TensorId(0)], &[TensorId(1)])
            .unwrap_err();
        assert!(matches!(err, BackendError::Kernel(_)));
        assert_eq!(backend.stats().executed_ops, vec!["abs", "relu"]);
    }

    #[test]
    fn test_dummy_backend_rejects_unallocated_tensor() {
        let mut backend = DummyBackend::new(Device::Cpu);
        let err = backend
            .execute_op(&Op::Abs, &[TensorId(0)], &[TensorId(1)])
            .unwrap_err();
        assert!(matches!(err, BackendError::TensorNotFound(TensorId(0))));
    }

    #[test]
    fn test_factory_shares_stats() {
        let factory = DummyBackendFactory::new(Device::Gpu);
        assert!(factory.exclusive());

        {
            let mut backend = factory.create().unwrap();
            backend.alloc(&desc(0, vec![2])).unwrap();
            backend.free(TensorId(0)).unwrap();
        }

        let stats = factory.stats();
        let stats = stats.lock().unwrap();
        assert_eq!(stats.alloc_count, 1);
        assert_eq!(stats.free_count, 1);
    }
}
