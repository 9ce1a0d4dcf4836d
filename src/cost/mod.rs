//! Cost data model shared by the static and dynamic paths.

pub mod record;
pub mod signature;

pub use record::{CostData, CostRecord};
pub use signature::{Direction, OperatorSignature, DEFAULT_DTYPE, DEFAULT_DTYPE_ALIAS};
