//! Wall-clock timers for operator execution
//!
//! Timing brackets an op submission and the backend synchronize that follows
//! it, so the measured interval covers the whole execution whether the device
//! runs synchronously or not.
//!
//! # Example
//!
//! ```rust
//! use costforge::profiling::KernelTimer;
//!
//! let mut timer = KernelTimer::for_kernel("matmul");
//! timer.start();
//! // ... execute and synchronize ...
//! let elapsed_ms = timer.stop();
//! assert!(elapsed_ms >= 0.0);
//! ```

use std::time::Instant;

/// Timer for one kernel or one whole program run
///
/// A timer can be restarted; each `start` clears the previous measurement.
#[derive(Debug)]
pub struct KernelTimer {
    /// Name of the kernel being timed
    name: String,
    start: Option<Instant>,
    /// Elapsed time in milliseconds (after stop() is called)
    elapsed_ms: Option<f64>,
}

impl KernelTimer {
    pub fn for_kernel(name: impl Into<String>) -> Self {
        KernelTimer {
            name: name.into(),
            start: None,
            elapsed_ms: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.elapsed_ms = None;
    }

    /// Stop timing and return the elapsed milliseconds
    ///
    /// Stopping a timer that was never started measures nothing and
    /// returns 0.
    pub fn stop(&mut self) -> f64 {
        let elapsed = self
            .start
            .map(|start| start.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.elapsed_ms = Some(elapsed);
        elapsed
    }

    /// Elapsed time in milliseconds, `None` until stopped
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed_ms
    }

    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.elapsed_ms.is_some()
    }
}

/// Scoped timer that logs its elapsed time when dropped
///
/// ```rust
/// use costforge::profiling::ScopedTimer;
///
/// {
///     let _timer = ScopedTimer::new("init_graph");
///     // ... code to time ...
/// } // logs elapsed time at debug level
/// ```
#[derive(Debug)]
pub struct ScopedTimer {
    name: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(name: impl Into<String>) -> Self {
        ScopedTimer {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        tracing::debug!("ScopedTimer '{}': {:.3} ms", self.name, elapsed);
    }
}
