//! Serialized form of the static benchmark source
//!
//! The source is one JSON document: hardware metadata plus a flat list of
//! measured entries. Every field except `op` and `time_ms` has a default so
//! hand-written sources can stay short.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cost::{Direction, OperatorSignature, DEFAULT_DTYPE};

fn default_version() -> u32 {
    1
}

fn default_dtype() -> String {
    DEFAULT_DTYPE.to_string()
}

/// Hardware the benchmarks were recorded on
///
/// Informational only; lookups never filter on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HardwareInfo {
    /// Device class the entries were measured on ("cpu" or "gpu")
    pub device: Option<String>,
    /// GPU device name (if applicable)
    pub gpu_name: Option<String>,
    /// GPU architecture (e.g., "gfx1100")
    pub gpu_architecture: Option<String>,
    /// CPU architecture
    pub cpu_arch: String,
    pub os: String,
}

impl Default for HardwareInfo {
    fn default() -> Self {
        HardwareInfo {
            device: None,
            gpu_name: None,
            gpu_architecture: None,
            cpu_arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

impl HardwareInfo {
    pub fn with_gpu(gpu_name: impl Into<String>, gpu_architecture: impl Into<String>) -> Self {
        HardwareInfo {
            device: Some("gpu".to_string()),
            gpu_name: Some(gpu_name.into()),
            gpu_architecture: Some(gpu_architecture.into()),
            ..Self::default()
        }
    }

    /// Short human-readable description for logs
    pub fn summary(&self) -> String {
        match (&self.gpu_name, &self.gpu_architecture) {
            (Some(name), Some(arch)) => format!("{} ({}) on {}", name, arch, self.cpu_arch),
            (Some(name), None) => format!("{} on {}", name, self.cpu_arch),
            _ => format!("{}/{}", self.cpu_arch, self.os),
        }
    }
}

/// One benchmarked operator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkEntry {
    pub op: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    #[serde(default)]
    pub shape_config: Vec<Vec<usize>>,
    pub time_ms: f64,
    /// Representative entry for its (op, direction, dtype) group
    #[serde(default)]
    pub canonical: bool,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Human-readable description of the benchmarked configuration
    #[serde(default)]
    pub config: String,
}

impl BenchmarkEntry {
    pub fn new(op: impl Into<String>, time_ms: f64) -> Self {
        BenchmarkEntry {
            op: op.into(),
            direction: Direction::Forward,
            dtype: default_dtype(),
            shape_config: Vec::new(),
            time_ms,
            canonical: false,
            metrics: BTreeMap::new(),
            config: String::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn with_shapes(mut self, shape_config: Vec<Vec<usize>>) -> Self {
        self.shape_config = shape_config;
        self
    }

    pub fn canonical(mut self) -> Self {
        self.canonical = true;
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    pub fn signature(&self) -> OperatorSignature {
        OperatorSignature::new(self.op.clone())
            .with_direction(self.direction)
            .with_dtype(self.dtype.clone())
            .with_shapes(self.shape_config.clone())
    }
}

/// Whole benchmark source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    /// dtype that the `"default"` alias resolves to
    #[serde(default = "default_dtype")]
    pub default_dtype: String,
    #[serde(default)]
    pub hardware: HardwareInfo,
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkDocument {
    pub fn new(entries: Vec<BenchmarkEntry>) -> Self {
        BenchmarkDocument {
            version: default_version(),
            default_dtype: default_dtype(),
            hardware: HardwareInfo::default(),
            entries,
        }
    }
}
