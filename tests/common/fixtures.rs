//! Program graph and backend fixtures

use std::sync::{Arc, Mutex};
use std::time::Duration;

use costforge::backend::{DeviceRegistry, DummyBackendFactory, DummyBackendStats};
use costforge::cost::Direction;
use costforge::database::BenchmarkEntry;
use costforge::program::{Op, ProgramGraph, TensorDesc};
use costforge::Device;

/// `x -> abs -> relu -> scale` over an `n x n` tensor, with an init graph
/// filling `x`.
pub fn elementwise_chain(n: usize) -> (ProgramGraph, ProgramGraph) {
    let mut init = ProgramGraph::new();
    let x0 = init.add_tensor(TensorDesc::f32("x", vec![n, n]));
    init.add_node(Op::FillConstant { value: -2.0 }, vec![], vec![x0]);

    let mut graph = ProgramGraph::new();
    let x = graph.add_tensor(TensorDesc::f32("x", vec![n, n]));
    let a = graph.add_tensor(TensorDesc::f32("a", vec![n, n]));
    let r = graph.add_tensor(TensorDesc::f32("r", vec![n, n]));
    let s = graph.add_tensor(TensorDesc::f32("s", vec![n, n]));
    graph.add_node(Op::Abs, vec![x], vec![a]);
    graph.add_node(Op::Relu, vec![a], vec![r]);
    graph.add_node(Op::Scale { factor: 0.5 }, vec![r], vec![s]);

    (graph, init)
}

/// One matmul layer with bias and softmax; weights come from the init graph.
pub fn dense_layer(batch: usize, features: usize) -> (ProgramGraph, ProgramGraph) {
    let x = TensorDesc::f32("x", vec![batch, features]);
    let w = TensorDesc::f32("w", vec![features, features]);
    let b = TensorDesc::f32("b", vec![features]);

    let mut init = ProgramGraph::new();
    for (desc, value) in [(&x, 1.0), (&w, 0.02), (&b, 0.1)] {
        let id = init.add_tensor(desc.clone());
        init.add_node(Op::FillConstant { value }, vec![], vec![id]);
    }

    let mut graph = ProgramGraph::new();
    let x = graph.add_tensor(x);
    let w = graph.add_tensor(w);
    let b = graph.add_tensor(b);
    let h = graph.add_tensor(TensorDesc::f32("h", vec![batch, features]));
    let z = graph.add_tensor(TensorDesc::f32("z", vec![batch, features]));
    let p = graph.add_tensor(TensorDesc::f32("p", vec![batch, features]));
    graph.add_node(Op::MatMul, vec![x, w], vec![h]);
    graph.add_node(Op::ElementwiseAdd, vec![h, b], vec![z]);
    graph.add_node(Op::Softmax, vec![z], vec![p]);

    (graph, init)
}

/// Registry whose only backend for `device` is a dummy with the given
/// per-op latency; returns the shared stats handle.
pub fn dummy_registry(
    device: Device,
    latency: Duration,
    failing_op: Option<&str>,
) -> (DeviceRegistry, Arc<Mutex<DummyBackendStats>>) {
    let mut factory = DummyBackendFactory::new(device).with_op_latency(latency);
    if let Some(op) = failing_op {
        factory = factory.with_failing_op(op);
    }
    let stats = factory.stats();
    let mut registry = DeviceRegistry::new();
    registry.register(Arc::new(factory));
    (registry, stats)
}

/// Small benchmark set with one ambiguous-by-shape group
pub fn sample_entries() -> Vec<BenchmarkEntry> {
    vec![
        BenchmarkEntry::new("abs", 0.04).with_shapes(vec![vec![16, 1024]]),
        BenchmarkEntry::new("conv2d", 1.52)
            .with_shapes(vec![vec![16, 3, 224, 224], vec![64, 3, 7, 7]])
            .canonical()
            .with_config("canonical conv"),
        BenchmarkEntry::new("conv2d", 0.14)
            .with_shapes(vec![vec![1, 3, 224, 224], vec![64, 3, 7, 7]]),
        BenchmarkEntry::new("conv2d", 3.59)
            .with_direction(Direction::Backward)
            .with_shapes(vec![vec![16, 3, 224, 224], vec![64, 3, 7, 7]]),
        BenchmarkEntry::new("conv2d", 0.62)
            .with_dtype("float16")
            .with_shapes(vec![vec![16, 3, 224, 224], vec![64, 3, 7, 7]]),
    ]
}
