//! Cost records and aggregate cost data.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::backend::Device;
use crate::cost::OperatorSignature;
use crate::error::{CostModelError, CostResult};

fn check_value(what: &str, value: f64) -> CostResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CostModelError::InvalidRecord(format!(
            "{} must be finite and non-negative, got {}",
            what, value
        )));
    }
    Ok(())
}

/// A measured or looked-up cost for one operator configuration
///
/// Records are immutable once built. `time_ms` is always finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRecord {
    signature: OperatorSignature,
    time_ms: f64,
    other_metrics: BTreeMap<String, f64>,
    source_config: String,
}

impl CostRecord {
    /// Create a record, rejecting negative or non-finite times
    pub fn new(
        signature: OperatorSignature,
        time_ms: f64,
        source_config: impl Into<String>,
    ) -> CostResult<Self> {
        check_value("time_ms", time_ms)?;
        Ok(Self {
            signature,
            time_ms,
            other_metrics: BTreeMap::new(),
            source_config: source_config.into(),
        })
    }

    /// Attach an extra metric (e.g. `memory_bytes`)
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> CostResult<Self> {
        let name = name.into();
        check_value(&name, value)?;
        self.other_metrics.insert(name, value);
        Ok(self)
    }

    pub fn signature(&self) -> &OperatorSignature {
        &self.signature
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn other_metrics(&self) -> &BTreeMap<String, f64> {
        &self.other_metrics
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.other_metrics.get(name).copied()
    }

    /// The exact configuration that produced this record
    pub fn source_config(&self) -> &str {
        &self.source_config
    }
}

/// Result of profiling a whole program graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostData {
    device: Device,
    per_op_records: Vec<CostRecord>,
    whole_program_time_ms: f64,
    other_metrics: BTreeMap<String, f64>,
}

impl CostData {
    /// Cost of a graph with no operations: zero time, no records
    pub fn empty(device: Device) -> Self {
        Self {
            device,
            per_op_records: Vec::new(),
            whole_program_time_ms: 0.0,
            other_metrics: BTreeMap::new(),
        }
    }

    pub fn new(
        device: Device,
        per_op_records: Vec<CostRecord>,
        whole_program_time_ms: f64,
    ) -> CostResult<Self> {
        check_value("whole_program_time_ms", whole_program_time_ms)?;
        Ok(Self {
            device,
            per_op_records,
            whole_program_time_ms,
            other_metrics: BTreeMap::new(),
        })
    }

    /// Attach a program-level metric (e.g. peak `memory_bytes`)
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> CostResult<Self> {
        let name = name.into();
        check_value(&name, value)?;
        self.other_metrics.insert(name, value);
        Ok(self)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Measured end-to-end time of the program in milliseconds
    pub fn whole_program_time_ms(&self) -> f64 {
        self.whole_program_time_ms
    }

    pub fn op_records(&self) -> &[CostRecord] {
        &self.per_op_records
    }

    /// Time of the `index`-th operation in graph order
    pub fn op_time_ms(&self, index: usize) -> Option<f64> {
        self.per_op_records.get(index).map(CostRecord::time_ms)
    }

    /// Sum of per-op times; never exceeds the whole-program time by more
    /// than timer jitter.
    pub fn total_op_time_ms(&self) -> f64 {
        self.per_op_records.iter().map(CostRecord::time_ms).sum()
    }

    /// Time spent between ops (dispatch, bookkeeping)
    pub fn overhead_ms(&self) -> f64 {
        (self.whole_program_time_ms - self.total_op_time_ms()).max(0.0)
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.other_metrics.get(name).copied()
    }

    pub fn other_metrics(&self) -> &BTreeMap<String, f64> {
        &self.other_metrics
    }

    pub fn num_ops(&self) -> usize {
        self.per_op_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_op_records.is_empty()
    }

    /// Writes a human-readable report to the given writer.
    pub fn write_report(&self, mut w: impl Write) -> std::io::Result<()> {
        writeln!(w, "Device:             {}", self.device)?;
        writeln!(w, "Operations:         {}", self.num_ops())?;
        writeln!(w, "Whole program:      {:.4} ms", self.whole_program_time_ms)?;
        writeln!(w, "Sum of ops:         {:.4} ms", self.total_op_time_ms())?;
        writeln!(w, "Overhead:           {:.4} ms", self.overhead_ms())?;
        for (name, value) in &self.other_metrics {
            writeln!(w, "{:<20}{:.0}", format!("{}:", name), value)?;
        }

        if self.per_op_records.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(w, "{:>4}  {:>12}  {}", "#", "time (ms)", "operator")?;
        for (i, record) in self.per_op_records.iter().enumerate() {
            writeln!(w, "{:>4}  {:>12.4}  {}", i, record.time_ms(), record.signature())?;
        }
        Ok(())
    }
}
