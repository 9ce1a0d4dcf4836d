//! Minimal program-graph IR consumed by the profiler.

pub mod graph;
pub mod op;
pub mod tensor;

pub use graph::{Node, ProgramGraph};
pub use op::Op;
pub use tensor::{DType, TensorDesc, TensorId};
