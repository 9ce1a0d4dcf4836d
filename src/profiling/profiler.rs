//! Dynamic profiler: run a program graph and time every op
//!
//! One call to [`Profiler::profile`] leases a fresh backend for the target
//! device, allocates every tensor of both graphs, runs the init graph once
//! untimed, then executes the main graph op by op. Each op is timed from
//! submission until the backend reports it finished; a second timer covers
//! the whole run.

use std::collections::HashMap;

use crate::backend::{BackendLease, Device, DeviceRegistry};
use crate::config::ProfilerConfig;
use crate::cost::{CostData, CostRecord};
use crate::error::{CostModelError, CostResult};
use crate::profiling::kernel_timer::{KernelTimer, ScopedTimer};
use crate::profiling::metrics::{Metric, MetricSet, MEMORY_BYTES};
use crate::program::{Node, ProgramGraph, TensorDesc, TensorId};

/// Tensors of one profiling call, keyed by name across both graphs
#[derive(Debug, Default)]
struct SessionTensors {
    descs: Vec<TensorDesc>,
    by_name: HashMap<String, TensorId>,
}

impl SessionTensors {
    /// Map each tensor of `graph` to its session id, adding new names
    fn bind(&mut self, graph: &ProgramGraph) -> CostResult<Vec<TensorId>> {
        let mut ids = Vec::with_capacity(graph.tensors.len());
        for desc in &graph.tensors {
            let id = match self.by_name.get(&desc.name) {
                Some(&id) => {
                    let existing = &self.descs[id.0];
                    if !existing.same_layout(desc) {
                        return Err(CostModelError::InvalidGraph(format!(
                            "tensor '{}' declared as {:?} {} and {:?} {}",
                            desc.name, existing.shape, existing.dtype, desc.shape, desc.dtype
                        )));
                    }
                    id
                }
                None => {
                    let id = TensorId(self.descs.len());
                    let mut session_desc = desc.clone();
                    session_desc.id = id;
                    self.descs.push(session_desc);
                    self.by_name.insert(desc.name.clone(), id);
                    id
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Graph with its tensor ids translated into session ids
struct BoundGraph<'g> {
    graph: &'g ProgramGraph,
    ids: Vec<TensorId>,
}

impl BoundGraph<'_> {
    fn map(&self, local: &[TensorId]) -> Vec<TensorId> {
        local.iter().map(|id| self.ids[id.0]).collect()
    }

    fn execute_node(&self, lease: &mut BackendLease<'_>, index: usize, node: &Node) -> CostResult<()> {
        let inputs = self.map(&node.inputs);
        let outputs = self.map(&node.outputs);
        lease
            .execute_op(&node.op, &inputs, &outputs)
            .map_err(|e| execution_failed(index, node, e))
    }

    /// Execute every node and synchronize once at the end
    fn run_untimed(&self, lease: &mut BackendLease<'_>) -> CostResult<()> {
        for (index, node) in self.graph.nodes.iter().enumerate() {
            self.execute_node(lease, index, node)?;
        }
        lease.synchronize()?;
        Ok(())
    }

    fn output_bytes(&self, node: &Node) -> usize {
        node.outputs
            .iter()
            .filter_map(|id| self.graph.tensor(*id))
            .map(TensorDesc::byte_size)
            .sum()
    }
}

fn execution_failed(index: usize, node: &Node, err: impl std::fmt::Display) -> CostModelError {
    CostModelError::ExecutionFailed(format!("node {} ({}): {}", index, node.op.name(), err))
}

fn describe(device: Device, graph: &ProgramGraph, node: &Node) -> String {
    let shapes: Vec<String> = node
        .inputs
        .iter()
        .filter_map(|id| graph.tensor(*id))
        .map(|t| format!("{} {:?} {}", t.name, t.shape, t.dtype))
        .collect();
    format!(
        "{} {} on {}: inputs [{}]",
        node.op.name(),
        node.direction,
        device,
        shapes.join(", ")
    )
}

/// Measures program graphs on live backends
#[derive(Debug)]
pub struct Profiler {
    registry: DeviceRegistry,
    config: ProfilerConfig,
}

impl Profiler {
    /// Profiler over the default registry (host CPU only)
    pub fn new(config: ProfilerConfig) -> Self {
        Self::with_registry(DeviceRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: DeviceRegistry, config: ProfilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Profile `graph` on `device` after running `init_graph` once
    ///
    /// Checks the device first, then the metric names. A graph without ops
    /// costs nothing and never reaches a backend. Tensors are shared between
    /// the two graphs by name.
    pub fn profile<S: AsRef<str>>(
        &self,
        graph: &ProgramGraph,
        init_graph: &ProgramGraph,
        device: Device,
        metrics: &[S],
    ) -> CostResult<CostData> {
        self.registry.check_available(device)?;
        let metrics = MetricSet::parse(metrics)?;

        if graph.is_empty() {
            tracing::debug!(device = %device, "Empty graph, nothing to profile");
            return Ok(CostData::empty(device));
        }

        graph.validate()?;
        init_graph.validate()?;

        let mut session = SessionTensors::default();
        let init = BoundGraph {
            graph: init_graph,
            ids: session.bind(init_graph)?,
        };
        let main = BoundGraph {
            graph,
            ids: session.bind(graph)?,
        };

        let mut lease = self.registry.acquire(device)?;
        for desc in &session.descs {
            lease.alloc(desc)?;
        }
        let peak_bytes = lease.allocated_bytes();

        if !init_graph.is_empty() {
            let _timer = ScopedTimer::new("init_graph");
            init.run_untimed(&mut lease)?;
        }

        for _ in 0..self.config.warmup_runs {
            main.run_untimed(&mut lease)?;
        }

        let mut op_times = Vec::with_capacity(graph.num_ops());
        let mut op_timer = KernelTimer::for_kernel("op");
        let mut whole_timer = KernelTimer::for_kernel("program");

        whole_timer.start();
        for (index, node) in graph.nodes.iter().enumerate() {
            op_timer.start();
            main.execute_node(&mut lease, index, node)?;
            lease
                .synchronize()
                .map_err(|e| execution_failed(index, node, e))?;
            op_times.push(op_timer.stop());
        }
        let whole_ms = whole_timer.stop();

        lease.release_all()?;
        drop(lease);

        let mut records = Vec::with_capacity(op_times.len());
        for (node, time_ms) in graph.nodes.iter().zip(op_times) {
            let signature = graph.signature_of(node);
            tracing::debug!(op = %signature, time_ms, "Profiled op");

            let mut record = CostRecord::new(signature, time_ms, describe(device, graph, node))?;
            if metrics.contains(Metric::Memory) {
                record = record.with_metric(MEMORY_BYTES, main.output_bytes(node) as f64)?;
            }
            records.push(record);
        }

        let mut data = CostData::new(device, records, whole_ms)?;
        if metrics.contains(Metric::Memory) {
            data = data.with_metric(MEMORY_BYTES, peak_bytes as f64)?;
        }

        tracing::info!(
            device = %device,
            ops = data.num_ops(),
            whole_ms = data.whole_program_time_ms(),
            "Profiled program"
        );
        Ok(data)
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}
