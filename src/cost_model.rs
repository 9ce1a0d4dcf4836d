//! Cost model façade
//!
//! [`CostModel`] exposes the two estimation paths as separate operations:
//!
//! - [`CostModel::profile_measure`] runs a graph on a device and measures it
//! - [`CostModel::get_static_op_time`] reads a benchmarked cost without
//!   running anything
//!
//! The paths share nothing. The static database loads on the first static
//! call; profiling never touches it.

use serde::Serialize;

use crate::backend::{Device, DeviceRegistry};
use crate::config::CostModelConfig;
use crate::cost::{CostData, Direction, OperatorSignature, DEFAULT_DTYPE_ALIAS};
use crate::database::StaticCostDatabase;
use crate::error::CostResult;
use crate::profiling::Profiler;
use crate::program::ProgramGraph;

/// Lifecycle of the static database inside a [`CostModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModelState {
    Uninitialized,
    DatabaseLoaded,
}

/// Result of a static lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticOpTime {
    /// Benchmarked time in milliseconds, always > 0
    pub op_time: f64,
    /// Configuration the time was recorded for
    pub config: OperatorSignature,
    /// Description of the benchmarked configuration from the source
    pub source_config: String,
}

#[derive(Debug)]
pub struct CostModel {
    database: StaticCostDatabase,
    profiler: Profiler,
}

impl CostModel {
    /// Cost model over the embedded dataset and the host CPU
    pub fn new() -> Self {
        Self::with_config(CostModelConfig::default())
    }

    pub fn with_config(config: CostModelConfig) -> Self {
        Self::with_registry(config, DeviceRegistry::with_defaults())
    }

    /// Cost model profiling on the backends in `registry`
    pub fn with_registry(config: CostModelConfig, registry: DeviceRegistry) -> Self {
        Self {
            database: StaticCostDatabase::new(config.benchmark_source),
            profiler: Profiler::with_registry(registry, config.profiler),
        }
    }

    pub fn state(&self) -> CostModelState {
        if self.database.is_loaded() {
            CostModelState::DatabaseLoaded
        } else {
            CostModelState::Uninitialized
        }
    }

    pub fn static_database(&self) -> &StaticCostDatabase {
        &self.database
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Measure `graph` on `device`; see [`Profiler::profile`]
    pub fn profile_measure<S: AsRef<str>>(
        &self,
        graph: &ProgramGraph,
        init_graph: &ProgramGraph,
        device: Device,
        metrics: &[S],
    ) -> CostResult<CostData> {
        self.profiler.profile(graph, init_graph, device, metrics)
    }

    /// Load the static database; later calls are no-ops
    pub fn static_cost_data(&self) -> CostResult<()> {
        self.database.load()
    }

    /// Benchmarked time of `op_name`
    ///
    /// `forward = false` selects the backward kernel. `dtype` may be
    /// `"default"`.
    pub fn get_static_op_time(
        &self,
        op_name: &str,
        forward: bool,
        dtype: &str,
    ) -> CostResult<StaticOpTime> {
        let record = self
            .database
            .lookup(op_name, Direction::from_forward_flag(forward), dtype)?;
        Ok(StaticOpTime {
            op_time: record.time_ms(),
            source_config: record.source_config().to_string(),
            config: record.signature().clone(),
        })
    }

    /// Forward, default-dtype lookup
    pub fn static_op_time(&self, op_name: &str) -> CostResult<StaticOpTime> {
        self.get_static_op_time(op_name, true, DEFAULT_DTYPE_ALIAS)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new()
    }
}
