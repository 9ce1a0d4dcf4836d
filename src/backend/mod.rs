//! Execution backends the profiler drives
//!
//! The profiler only needs a narrow run API: allocate tensors, execute one op,
//! synchronize, free. Anything that implements [`ExecutionBackend`] can be
//! measured; [`BackendFactory`] hands out one isolated backend per profiling
//! call.

pub mod cpu;
pub mod device;
pub mod dummy;
pub mod registry;

use thiserror::Error;

use crate::program::{Op, TensorDesc, TensorId};

pub use cpu::{CpuBackend, CpuBackendFactory};
pub use device::Device;
pub use dummy::{DummyBackend, DummyBackendFactory, DummyBackendStats};
pub use registry::{BackendLease, DeviceRegistry};

/// Error type for backend operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("Tensor not allocated: {0:?}")]
    TensorNotFound(TensorId),
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Operation not implemented: {0}")]
    Unimplemented(String),
    #[error("Kernel failed: {0}")]
    Kernel(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Run API of an execution engine
///
/// Implementations own their device memory. `free` must accept every id that
/// `alloc` accepted.
pub trait ExecutionBackend: Send {
    /// Device this backend executes on
    fn device(&self) -> Device;

    fn alloc(&mut self, desc: &TensorDesc) -> BackendResult<()>;

    fn free(&mut self, id: TensorId) -> BackendResult<()>;

    fn execute_op(&mut self, op: &Op, inputs: &[TensorId], outputs: &[TensorId])
        -> BackendResult<()>;

    /// Block until all submitted work has finished
    fn synchronize(&mut self) -> BackendResult<()>;

    /// Bytes currently held by live allocations
    fn allocated_bytes(&self) -> usize;

    /// Number of live allocations
    fn live_tensors(&self) -> usize;
}

/// Creates backends for one device
pub trait BackendFactory: Send + Sync {
    fn device(&self) -> Device;

    /// Whether calls against this device must be serialized. Devices that
    /// share one physical context (GPUs) return true.
    fn exclusive(&self) -> bool {
        false
    }

    fn create(&self) -> BackendResult<Box<dyn ExecutionBackend>>;
}
