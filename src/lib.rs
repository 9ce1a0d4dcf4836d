//! costforge - operator cost model
//!
//! Estimates the execution cost of individual operators and whole program
//! graphs, either by running them on a device ([`CostModel::profile_measure`])
//! or by looking up benchmarked times ([`CostModel::get_static_op_time`]).
//!
//! ```rust
//! use costforge::CostModel;
//!
//! let model = CostModel::new();
//! let conv = model.get_static_op_time("conv2d", true, "float32").unwrap();
//! assert!(conv.op_time > 0.0);
//! ```

#![allow(clippy::needless_range_loop)] // Index loops mirror the kernel math

pub mod backend;
pub mod config;
pub mod cost;
pub mod cost_model;
pub mod database;
pub mod error;
pub mod logging;
pub mod profiling;
pub mod program;

pub use backend::Device;
pub use config::{CostModelConfig, ProfilerConfig};
pub use cost::{CostData, CostRecord, Direction, OperatorSignature};
pub use cost_model::{CostModel, CostModelState, StaticOpTime};
pub use database::{BenchmarkSource, StaticCostDatabase};
pub use error::{CostModelError, CostResult, ErrorCategory};
pub use profiling::{KernelTimer, Profiler, ScopedTimer};
pub use program::{Op, ProgramGraph, TensorDesc};
