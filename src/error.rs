//! Unified error handling for costforge
//!
//! This module provides a single error type for both cost-estimation paths.
//! Errors are categorized for handling decisions:
//! - User errors (bad metric names, malformed graphs)
//! - Lookup misses (operator or configuration absent from the benchmark data)
//! - Backend errors (device unavailable, execution failures)
//! - Data errors (benchmark source unreadable or invalid)
//! - Internal errors (bugs, poisoned locks)

use std::fmt;

use crate::backend::BackendError;
use crate::cost::Direction;

/// Unified error type for costforge
///
/// Every failure in the cost model is reported through this enum. No method
/// signals failure through a sentinel value such as a zero or negative time.
#[derive(Debug, thiserror::Error)]
pub enum CostModelError {
    // ========== Device / Profiling Errors ==========
    /// Requested device is not supported by the running build
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Caller asked for a metric the profiler cannot measure
    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    /// Caller asked for no metrics at all
    #[error("Metric set must not be empty")]
    EmptyMetricSet,

    /// Executing the graph on the backend failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Graph references tensors it does not declare
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    // ========== Static Lookup Errors ==========
    /// No benchmark record exists for this operator name
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// The operator exists but not for this direction/dtype pair
    #[error("Unknown configuration for operator '{op}': direction={direction}, dtype={dtype}")]
    UnknownConfiguration {
        op: String,
        direction: Direction,
        dtype: String,
    },

    /// Benchmark source could not be read, parsed or validated
    #[error("Static cost database unavailable: {0}")]
    DatabaseUnavailable(String),

    // ========== Internal Errors ==========
    /// A cost record violated its invariants (negative or non-finite time)
    #[error("Invalid cost record: {0}")]
    InvalidRecord(String),

    /// Lock poisoned (a thread panicked while holding a device lock)
    #[error("Internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl CostModelError {
    /// Categorize the error for handling decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            CostModelError::UnsupportedMetric(_)
            | CostModelError::EmptyMetricSet
            | CostModelError::InvalidGraph(_) => ErrorCategory::User,

            CostModelError::UnknownOperator(_)
            | CostModelError::UnknownConfiguration { .. } => ErrorCategory::NotFound,

            CostModelError::DeviceUnavailable(_) | CostModelError::ExecutionFailed(_) => {
                ErrorCategory::Backend
            }

            CostModelError::DatabaseUnavailable(_) => ErrorCategory::Data,

            CostModelError::InvalidRecord(_) | CostModelError::LockPoisoned(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// True for static-lookup misses.
    ///
    /// Callers that need a value anyway are expected to fall back to
    /// dynamic profiling when this returns true.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self.category(), ErrorCategory::NotFound)
    }

    /// Check if this is a user-facing error (actionable by users)
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User)
    }

    /// Check if this is an internal error (indicates a bug)
    pub fn is_internal_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Error category for handling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input from the caller
    User,
    /// Static lookup miss
    NotFound,
    /// Device or execution failure
    Backend,
    /// Benchmark data problem
    Data,
    /// Indicates a bug
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::NotFound => write!(f, "NotFound"),
            ErrorCategory::Backend => write!(f, "Backend"),
            ErrorCategory::Data => write!(f, "Data"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

// ========== Conversion Traits ==========

impl From<BackendError> for CostModelError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceUnavailable(msg) => CostModelError::DeviceUnavailable(msg),
            other => CostModelError::ExecutionFailed(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for CostModelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        CostModelError::LockPoisoned(err.to_string())
    }
}

/// Result alias used across the crate
pub type CostResult<T> = std::result::Result<T, CostModelError>;
