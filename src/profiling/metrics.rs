//! Metric selection for profiling runs.

use std::fmt;

use crate::error::{CostModelError, CostResult};

/// Name of the extra metric that carries byte counts
pub const MEMORY_BYTES: &str = "memory_bytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    /// Wall-clock execution time
    Time,
    /// Output bytes per op, peak allocated bytes per program
    Memory,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Time, Metric::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Memory => "memory",
        }
    }

    pub fn parse(name: &str) -> CostResult<Self> {
        match name.trim() {
            "time" => Ok(Metric::Time),
            "memory" => Ok(Metric::Memory),
            other => Err(CostModelError::UnsupportedMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, non-empty set of requested metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSet {
    time: bool,
    memory: bool,
}

impl MetricSet {
    /// Parse metric names; duplicates are allowed and collapse
    pub fn parse<S: AsRef<str>>(names: &[S]) -> CostResult<Self> {
        if names.is_empty() {
            return Err(CostModelError::EmptyMetricSet);
        }
        let mut set = MetricSet {
            time: false,
            memory: false,
        };
        for name in names {
            match Metric::parse(name.as_ref())? {
                Metric::Time => set.time = true,
                Metric::Memory => set.memory = true,
            }
        }
        Ok(set)
    }

    pub fn time_only() -> Self {
        MetricSet {
            time: true,
            memory: false,
        }
    }

    pub fn contains(&self, metric: Metric) -> bool {
        match metric {
            Metric::Time => self.time,
            Metric::Memory => self.memory,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Metric> + '_ {
        Metric::ALL.into_iter().filter(|m| self.contains(*m))
    }
}
