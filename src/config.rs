//! Configuration for the cost model
//!
//! [`CostModelConfig`] selects the static benchmark source and carries the
//! [`ProfilerConfig`]. Both are plain builders; [`CostModelConfig::from_env`]
//! layers environment overrides on top of the defaults.
//!
//! # Environment Variables
//!
//! - `COSTFORGE_STATIC_DB`: path of a JSON benchmark file to use instead of
//!   the embedded dataset
//! - `COSTFORGE_WARMUP_RUNS`: untimed graph executions before measuring

use std::path::PathBuf;

use crate::database::BenchmarkSource;

/// Environment variable naming a benchmark file
pub const STATIC_DB_ENV: &str = "COSTFORGE_STATIC_DB";

/// Environment variable for profiler warmup runs
pub const WARMUP_RUNS_ENV: &str = "COSTFORGE_WARMUP_RUNS";

/// Configuration for the profiler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Untimed executions of the graph before the measured one
    pub warmup_runs: usize,
}

impl ProfilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set warmup runs
    pub fn with_warmup_runs(mut self, warmup_runs: usize) -> Self {
        self.warmup_runs = warmup_runs;
        self
    }
}

/// Configuration for [`crate::CostModel`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostModelConfig {
    /// Where the static database reads its entries from
    pub benchmark_source: BenchmarkSource,

    /// Dynamic profiling settings
    pub profiler: ProfilerConfig,
}

impl CostModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the benchmark source
    pub fn with_benchmark_source(mut self, source: BenchmarkSource) -> Self {
        self.benchmark_source = source;
        self
    }

    /// Read static costs from a JSON file
    pub fn with_static_db(self, path: impl Into<PathBuf>) -> Self {
        self.with_benchmark_source(BenchmarkSource::File(path.into()))
    }

    /// Set profiler configuration
    pub fn with_profiler(mut self, profiler: ProfilerConfig) -> Self {
        self.profiler = profiler;
        self
    }

    /// Defaults overridden by `COSTFORGE_*` environment variables
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = std::env::var_os(STATIC_DB_ENV).filter(|p| !p.is_empty()) {
            config = config.with_static_db(PathBuf::from(path));
        }

        if let Ok(raw) = std::env::var(WARMUP_RUNS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(runs) => config.profiler.warmup_runs = runs,
                Err(e) => tracing::warn!(
                    var = WARMUP_RUNS_ENV,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid environment value"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_default() {
        let config = CostModelConfig::default();
        assert_eq!(config.benchmark_source, BenchmarkSource::Embedded);
        assert_eq!(config.profiler.warmup_runs, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = CostModelConfig::new()
            .with_static_db("/tmp/bench.json")
            .with_profiler(ProfilerConfig::new().with_warmup_runs(3));

        assert_eq!(
            config.benchmark_source,
            BenchmarkSource::File(PathBuf::from("/tmp/bench.json"))
        );
        assert_eq!(config.profiler.warmup_runs, 3);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var(STATIC_DB_ENV, "/opt/costs.json");
        std::env::set_var(WARMUP_RUNS_ENV, "2");
        let config = CostModelConfig::from_env();
        std::env::remove_var(STATIC_DB_ENV);
        std::env::remove_var(WARMUP_RUNS_ENV);

        assert_eq!(config.benchmark_source, BenchmarkSource::file("/opt/costs.json"));
        assert_eq!(config.profiler.warmup_runs, 2);
    }

    #[test]
    #[serial]
    fn test_config_from_env_ignores_bad_values() {
        std::env::remove_var(STATIC_DB_ENV);
        std::env::set_var(WARMUP_RUNS_ENV, "lots");
        let config = CostModelConfig::from_env();
        std::env::remove_var(WARMUP_RUNS_ENV);

        assert_eq!(config, CostModelConfig::default());
    }
}
