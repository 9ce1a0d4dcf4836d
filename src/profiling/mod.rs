//! Dynamic cost measurement
//!
//! # Modules
//!
//! - [`kernel_timer`] - wall-clock timers around op execution
//! - [`metrics`] - the metric names a profiling call may request
//! - [`profiler`] - executes a program graph and builds [`crate::CostData`]
//!
//! # Example
//!
//! ```rust
//! use costforge::backend::Device;
//! use costforge::profiling::Profiler;
//! use costforge::program::{Op, ProgramGraph, TensorDesc};
//!
//! let mut graph = ProgramGraph::new();
//! let x = graph.add_tensor(TensorDesc::f32("x", vec![64, 64]));
//! let y = graph.add_tensor(TensorDesc::f32("y", vec![64, 64]));
//! graph.add_node(Op::Abs, vec![x], vec![y]);
//!
//! let data = Profiler::default()
//!     .profile(&graph, &ProgramGraph::new(), Device::Cpu, &["time"])
//!     .unwrap();
//! assert_eq!(data.num_ops(), 1);
//! ```

pub mod kernel_timer;
pub mod metrics;
pub mod profiler;

pub use kernel_timer::{KernelTimer, ScopedTimer};
pub use metrics::{Metric, MetricSet, MEMORY_BYTES};
pub use profiler::Profiler;
