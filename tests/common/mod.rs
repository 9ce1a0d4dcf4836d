//! Shared fixtures for costforge integration tests
//!
//! - [`fixtures`]: program graphs and dummy-backed registries
//! - [`tempfile_helpers`]: benchmark sources written to temporary files
//!
//! The embedded-dataset model is built once and shared; static lookups never
//! mutate it after the first load.

#![allow(dead_code)]

mod fixtures;
mod tempfile_helpers;

use costforge::CostModel;
use once_cell::sync::Lazy;
pub use serial_test::serial;

pub use fixtures::*;
pub use tempfile_helpers::*;

/// Cost model over the embedded benchmark dataset
pub static EMBEDDED_MODEL: Lazy<CostModel> = Lazy::new(CostModel::new);
