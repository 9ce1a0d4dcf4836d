//! Operations a program graph can contain.

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Fill the output with a constant (used by init graphs for weights)
    FillConstant { value: f32 },
    Abs,
    Relu,
    ElementwiseAdd,
    Scale { factor: f32 },
    MatMul,
    Softmax,
    Assign,
    /// NCHW convolution, square stride and zero padding
    Conv2d { stride: usize, padding: usize },
    Reshape2,
}

impl Op {
    /// Canonical operator name, matching the benchmark data
    pub fn name(&self) -> &'static str {
        match self {
            Op::FillConstant { .. } => "fill_constant",
            Op::Abs => "abs",
            Op::Relu => "relu",
            Op::ElementwiseAdd => "elementwise_add",
            Op::Scale { .. } => "scale",
            Op::MatMul => "matmul",
            Op::Softmax => "softmax",
            Op::Assign => "assign",
            Op::Conv2d { .. } => "conv2d",
            Op::Reshape2 => "reshape2",
        }
    }

    /// Number of (inputs, outputs) the op expects
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Op::FillConstant { .. } => (0, 1),
            Op::ElementwiseAdd | Op::MatMul | Op::Conv2d { .. } => (2, 1),
            Op::Abs
            | Op::Relu
            | Op::Scale { .. }
            | Op::Softmax
            | Op::Assign
            | Op::Reshape2 => (1, 1),
        }
    }
}
