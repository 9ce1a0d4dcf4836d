//! Static cost database
//!
//! An in-memory table of benchmarked operator costs, built once from a
//! [`BenchmarkSource`] and read-only afterwards. Loading is lazy: the first
//! lookup (or an explicit [`StaticCostDatabase::load`]) reads the source;
//! later calls reuse the table and never touch the source again.
//!
//! When several entries share an operator name, direction and dtype (they
//! differ only in shapes), exactly one of them must carry `"canonical": true`.
//! Lookups by name return that entry. The choice is part of the data and is
//! checked at load time.

pub mod storage;
pub mod types;

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::OnceCell;

use crate::cost::{CostRecord, Direction, OperatorSignature, DEFAULT_DTYPE_ALIAS};
use crate::error::{CostModelError, CostResult};

pub use storage::{load_document, save_document, BenchmarkSource};
pub use types::{BenchmarkDocument, BenchmarkEntry, HardwareInfo};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    name: String,
    direction: Direction,
    dtype: String,
}

impl GroupKey {
    fn of(signature: &OperatorSignature) -> Self {
        GroupKey {
            name: signature.name.clone(),
            direction: signature.direction,
            dtype: signature.dtype.clone(),
        }
    }
}

#[derive(Debug)]
struct CostTable {
    records: HashMap<OperatorSignature, CostRecord>,
    /// Representative signature of each (name, direction, dtype) group
    canonical: HashMap<GroupKey, OperatorSignature>,
    operators: BTreeSet<String>,
    default_dtype: String,
    hardware: HardwareInfo,
}

impl CostTable {
    fn build(document: BenchmarkDocument) -> CostResult<Self> {
        if document.entries.is_empty() {
            return Err(invalid("benchmark source has no entries"));
        }

        let mut records = HashMap::with_capacity(document.entries.len());
        let mut groups: HashMap<GroupKey, Vec<(OperatorSignature, bool)>> = HashMap::new();

        for (index, entry) in document.entries.into_iter().enumerate() {
            if entry.op.trim().is_empty() {
                return Err(invalid(format!("entry {} has an empty operator name", index)));
            }
            if !entry.time_ms.is_finite() || entry.time_ms <= 0.0 {
                return Err(invalid(format!(
                    "entry {} ({}) has invalid time_ms {}",
                    index, entry.op, entry.time_ms
                )));
            }

            let signature = entry.signature();
            let source_config = if entry.config.is_empty() {
                signature.to_string()
            } else {
                entry.config.clone()
            };

            let mut record = CostRecord::new(signature.clone(), entry.time_ms, source_config)
                .map_err(|e| invalid(format!("entry {}: {}", index, e)))?;
            for (name, value) in &entry.metrics {
                record = record
                    .with_metric(name.clone(), *value)
                    .map_err(|e| invalid(format!("entry {}: {}", index, e)))?;
            }

            if records.insert(signature.clone(), record).is_some() {
                return Err(invalid(format!("duplicate entry for {}", signature)));
            }
            groups
                .entry(GroupKey::of(&signature))
                .or_default()
                .push((signature, entry.canonical));
        }

        let mut canonical = HashMap::with_capacity(groups.len());
        for (key, members) in groups {
            let tagged: Vec<&OperatorSignature> = members
                .iter()
                .filter(|(_, is_canonical)| *is_canonical)
                .map(|(sig, _)| sig)
                .collect();

            let chosen = match (members.len(), tagged.len()) {
                (1, _) => members[0].0.clone(),
                (_, 1) => tagged[0].clone(),
                (n, 0) => {
                    return Err(invalid(format!(
                        "{} entries for {} ({}, {}) but none is tagged canonical",
                        n, key.name, key.direction, key.dtype
                    )))
                }
                (_, t) => {
                    return Err(invalid(format!(
                        "{} entries for {} ({}, {}) are tagged canonical",
                        t, key.name, key.direction, key.dtype
                    )))
                }
            };
            canonical.insert(key, chosen);
        }

        let operators = records.keys().map(|sig| sig.name.clone()).collect();

        Ok(CostTable {
            records,
            canonical,
            operators,
            default_dtype: document.default_dtype,
            hardware: document.hardware,
        })
    }

    fn resolve_dtype<'a>(&'a self, dtype: &'a str) -> &'a str {
        if dtype == DEFAULT_DTYPE_ALIAS {
            &self.default_dtype
        } else {
            dtype
        }
    }

    fn lookup(&self, name: &str, direction: Direction, dtype: &str) -> CostResult<&CostRecord> {
        if !self.operators.contains(name) {
            return Err(CostModelError::UnknownOperator(name.to_string()));
        }

        let dtype = self.resolve_dtype(dtype);
        let key = GroupKey {
            name: name.to_string(),
            direction,
            dtype: dtype.to_string(),
        };
        self.canonical
            .get(&key)
            .and_then(|sig| self.records.get(sig))
            .ok_or_else(|| CostModelError::UnknownConfiguration {
                op: name.to_string(),
                direction,
                dtype: dtype.to_string(),
            })
    }
}

fn invalid(msg: impl Into<String>) -> CostModelError {
    CostModelError::DatabaseUnavailable(msg.into())
}

/// Benchmarked operator costs, loaded at most once
///
/// Safe to share between threads: concurrent first lookups block on a
/// single load, and reads after that take no lock.
#[derive(Debug)]
pub struct StaticCostDatabase {
    source: BenchmarkSource,
    table: OnceCell<CostTable>,
}

impl StaticCostDatabase {
    pub fn new(source: BenchmarkSource) -> Self {
        Self {
            source,
            table: OnceCell::new(),
        }
    }

    /// Database over the dataset compiled into the crate
    pub fn embedded() -> Self {
        Self::new(BenchmarkSource::Embedded)
    }

    pub fn source(&self) -> &BenchmarkSource {
        &self.source
    }

    /// Read the source and build the table; no-op once loaded
    ///
    /// A failed load leaves the database unloaded, so a later call retries.
    pub fn load(&self) -> CostResult<()> {
        self.table()?;
        Ok(())
    }

    fn table(&self) -> CostResult<&CostTable> {
        self.table.get_or_try_init(|| {
            let document = self.source.read()?;
            let table = CostTable::build(document).map_err(|e| {
                tracing::warn!(source = %self.source, error = %e, "Rejected benchmark source");
                e
            })?;
            tracing::info!(
                source = %self.source,
                records = table.records.len(),
                operators = table.operators.len(),
                hardware = %table.hardware.summary(),
                "Loaded static cost database"
            );
            Ok(table)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    /// Look up the canonical record for an operator
    ///
    /// `dtype` may be `"default"`, which resolves to the source's default
    /// dtype. Loads the database on first use.
    pub fn lookup(&self, name: &str, direction: Direction, dtype: &str) -> CostResult<CostRecord> {
        let record = self.table()?.lookup(name, direction, dtype)?;
        tracing::trace!(signature = %record.signature(), time_ms = record.time_ms(), "Static lookup");
        Ok(record.clone())
    }

    /// Look up an exact configuration, shapes included
    pub fn lookup_exact(&self, signature: &OperatorSignature) -> CostResult<CostRecord> {
        let table = self.table()?;
        if !table.operators.contains(&signature.name) {
            return Err(CostModelError::UnknownOperator(signature.name.clone()));
        }
        let dtype = table.resolve_dtype(&signature.dtype);
        let resolved = signature.clone().with_dtype(dtype);
        table
            .records
            .get(&resolved)
            .cloned()
            .ok_or_else(|| CostModelError::UnknownConfiguration {
                op: signature.name.clone(),
                direction: signature.direction,
                dtype: dtype.to_string(),
            })
    }

    /// Number of records
    pub fn len(&self) -> CostResult<usize> {
        Ok(self.table()?.records.len())
    }

    pub fn is_empty(&self) -> CostResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Distinct operator names, sorted
    pub fn operators(&self) -> CostResult<Vec<String>> {
        Ok(self.table()?.operators.iter().cloned().collect())
    }

    /// Every configuration recorded for `name`, ordered by direction, dtype
    /// and shapes
    pub fn records_for(&self, name: &str) -> CostResult<Vec<CostRecord>> {
        let table = self.table()?;
        if !table.operators.contains(name) {
            return Err(CostModelError::UnknownOperator(name.to_string()));
        }
        let mut records: Vec<CostRecord> = table
            .records
            .values()
            .filter(|r| r.signature().name == name)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            let (a, b) = (a.signature(), b.signature());
            (a.direction.as_str(), &a.dtype, &a.shape_config).cmp(&(
                b.direction.as_str(),
                &b.dtype,
                &b.shape_config,
            ))
        });
        Ok(records)
    }

    /// Directions and dtypes recorded for `name`
    pub fn configurations(&self, name: &str) -> CostResult<Vec<(Direction, String)>> {
        let mut seen = HashSet::new();
        Ok(self
            .records_for(name)?
            .into_iter()
            .map(|r| (r.signature().direction, r.signature().dtype.clone()))
            .filter(|pair| seen.insert(pair.clone()))
            .collect())
    }

    /// dtype the `"default"` alias resolves to
    pub fn default_dtype(&self) -> CostResult<&str> {
        Ok(&self.table()?.default_dtype)
    }

    pub fn hardware(&self) -> CostResult<&HardwareInfo> {
        Ok(&self.table()?.hardware)
    }
}

impl Default for StaticCostDatabase {
    fn default() -> Self {
        Self::embedded()
    }
}
