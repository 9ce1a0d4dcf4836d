//! Reading and writing benchmark sources
//!
//! Sources are either compiled into the crate, read from a JSON file, or
//! passed in as a JSON string. All read failures surface as
//! [`CostModelError::DatabaseUnavailable`].

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::database::types::BenchmarkDocument;
use crate::error::{CostModelError, CostResult};

/// Dataset shipped with the crate
const EMBEDDED_BENCHMARKS: &str = include_str!("../../data/static_op_benchmark.json");

/// Where the static database reads its entries from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BenchmarkSource {
    /// Dataset compiled into the crate
    #[default]
    Embedded,
    /// JSON file on disk, read once at load time
    File(PathBuf),
    /// JSON document held in memory
    Json(String),
}

impl BenchmarkSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        BenchmarkSource::File(path.into())
    }

    /// Read and parse the document
    pub fn read(&self) -> CostResult<BenchmarkDocument> {
        match self {
            BenchmarkSource::Embedded => parse_document(EMBEDDED_BENCHMARKS, "embedded dataset"),
            BenchmarkSource::File(path) => load_document(path),
            BenchmarkSource::Json(json) => parse_document(json, "inline JSON"),
        }
    }
}

impl fmt::Display for BenchmarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkSource::Embedded => write!(f, "embedded"),
            BenchmarkSource::File(path) => write!(f, "{}", path.display()),
            BenchmarkSource::Json(_) => write!(f, "inline JSON"),
        }
    }
}

fn parse_document(contents: &str, origin: &str) -> CostResult<BenchmarkDocument> {
    serde_json::from_str(contents).map_err(|e| {
        CostModelError::DatabaseUnavailable(format!("Invalid benchmark JSON in {}: {}", origin, e))
    })
}

/// Load a benchmark document from a JSON file
pub fn load_document<P: AsRef<Path>>(path: P) -> CostResult<BenchmarkDocument> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| {
        CostModelError::DatabaseUnavailable(format!(
            "Failed to open benchmark file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CostModelError::DatabaseUnavailable(e.to_string()))?;

    parse_document(&contents, &path.display().to_string())
}

/// Save a benchmark document as pretty-printed JSON
pub fn save_document<P: AsRef<Path>>(document: &BenchmarkDocument, path: P) -> CostResult<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| CostModelError::DatabaseUnavailable(e.to_string()))?;

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CostModelError::DatabaseUnavailable(e.to_string()))?;
    }

    let mut file = std::fs::File::create(path)
        .map_err(|e| CostModelError::DatabaseUnavailable(e.to_string()))?;
    file.write_all(json.as_bytes())
        .map_err(|e| CostModelError::DatabaseUnavailable(e.to_string()))?;

    Ok(())
}
