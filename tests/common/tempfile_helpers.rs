//! Helpers for benchmark sources on disk

use std::path::PathBuf;

use anyhow::Context;
use costforge::database::{save_document, BenchmarkDocument, BenchmarkEntry};

/// Create a temp directory with a helpful error message.
pub fn create_temp_dir() -> anyhow::Result<tempfile::TempDir> {
    tempfile::tempdir().context("Failed to create temporary directory for test")
}

/// Write `entries` as a benchmark file inside a fresh temp directory.
///
/// Keep the returned `TempDir` alive for as long as the file is needed.
pub fn write_benchmark_file(
    entries: Vec<BenchmarkEntry>,
) -> anyhow::Result<(tempfile::TempDir, PathBuf)> {
    let dir = create_temp_dir()?;
    let path = dir.path().join("static_op_benchmark.json");
    save_document(&BenchmarkDocument::new(entries), &path)
        .context("Failed to write benchmark file")?;
    Ok((dir, path))
}

/// Write raw text (possibly invalid JSON) as a benchmark file.
pub fn write_raw_benchmark_file(contents: &str) -> anyhow::Result<(tempfile::TempDir, PathBuf)> {
    let dir = create_temp_dir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, contents).context("Failed to write benchmark file")?;
    Ok((dir, path))
}
