//! Dynamic profiling against the CPU backend and dummy backends

mod common;

use std::time::Duration;

use common::{dense_layer, dummy_registry, elementwise_chain};
use costforge::backend::DeviceRegistry;
use costforge::profiling::MEMORY_BYTES;
use costforge::program::{Op, ProgramGraph, TensorDesc};
use costforge::{CostModel, CostModelConfig, CostModelError, Device, Profiler, ProfilerConfig};

#[test]
fn test_empty_graph_on_every_available_device() {
    let model = CostModel::new();
    let empty = ProgramGraph::new();
    let (_, init) = elementwise_chain(4);

    for device in model.profiler().registry().devices() {
        let data = model
            .profile_measure(&empty, &init, device, &["time", "memory"])
            .unwrap();
        assert_eq!(data.whole_program_time_ms(), 0.0);
        assert!(data.is_empty());
        assert_eq!(data.device(), device);
    }
}

#[test]
fn test_sequential_profiles_are_consistent() {
    let (registry, _stats) = dummy_registry(Device::Cpu, Duration::from_millis(2), None);
    let model = CostModel::with_registry(CostModelConfig::default(), registry);
    let (graph, init) = elementwise_chain(16);

    for _ in 0..2 {
        let data = model
            .profile_measure(&graph, &init, Device::Cpu, &["time"])
            .unwrap();
        let whole = data.whole_program_time_ms();
        let sum = data.total_op_time_ms();

        assert!(whole > 0.0);
        assert_eq!(data.num_ops(), 3);
        assert!(sum <= whole + 1e-6, "sum {} > whole {}", sum, whole);
        assert!(whole - sum < 0.5 * whole, "overhead too large: {} vs {}", sum, whole);
        for index in 0..3 {
            assert!(data.op_time_ms(index).unwrap() >= 2.0);
        }
    }
}

#[test]
fn test_cpu_backend_profile() {
    let model = CostModel::new();
    let (graph, init) = dense_layer(32, 64);

    let data = model
        .profile_measure(&graph, &init, Device::Cpu, &["time", "memory"])
        .unwrap();

    assert!(data.whole_program_time_ms() > 0.0);
    assert!(data.total_op_time_ms() <= data.whole_program_time_ms() + 1e-6);

    let names: Vec<&str> = data
        .op_records()
        .iter()
        .map(|r| r.signature().name.as_str())
        .collect();
    assert_eq!(names, vec!["matmul", "elementwise_add", "softmax"]);

    let matmul = &data.op_records()[0];
    assert_eq!(matmul.signature().shape_config, vec![vec![32, 64], vec![64, 64]]);
    assert_eq!(matmul.metric(MEMORY_BYTES), Some((32 * 64 * 4) as f64));

    // x, w, b, h, z, p
    let expected_peak = (32 * 64 + 64 * 64 + 64 + 3 * 32 * 64) * 4;
    assert_eq!(data.metric(MEMORY_BYTES), Some(expected_peak as f64));
}

#[test]
fn test_concurrent_profiles_on_one_device_are_isolated() {
    let (registry, stats) = dummy_registry(Device::Cpu, Duration::from_millis(1), None);
    let model = CostModel::with_registry(CostModelConfig::default(), registry);
    let (graph, init) = elementwise_chain(8);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| model.profile_measure(&graph, &init, Device::Cpu, &["time"])))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for data in results {
        let data = data.unwrap();
        let whole = data.whole_program_time_ms();
        assert!(whole > 0.0);
        assert_eq!(data.num_ops(), 3);
        assert!(data.total_op_time_ms() <= whole + 1e-6);
    }

    // Each run allocates x, a, r, s on its own backend
    let stats = stats.lock().unwrap();
    assert_eq!(stats.alloc_count, 32);
    assert_eq!(stats.free_count, 32);
    assert_eq!(stats.live_allocations(), 0);
}

#[cfg(not(feature = "rocm"))]
#[test]
fn test_gpu_unavailable_without_rocm() {
    // Even a registered GPU factory cannot be used by this build
    let (registry, stats) = dummy_registry(Device::Gpu, Duration::ZERO, None);
    let profiler = Profiler::with_registry(registry, ProfilerConfig::default());
    let (graph, init) = elementwise_chain(4);

    let err = profiler
        .profile(&graph, &init, Device::Gpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::DeviceUnavailable(_)));

    let err = CostModel::new()
        .profile_measure(&ProgramGraph::new(), &init, Device::Gpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::DeviceUnavailable(_)));

    assert_eq!(stats.lock().unwrap().alloc_count, 0);
}

#[cfg(feature = "rocm")]
#[test]
fn test_gpu_profile_with_registered_backend() {
    let (registry, stats) = dummy_registry(Device::Gpu, Duration::from_millis(1), None);
    let profiler = Profiler::with_registry(registry, ProfilerConfig::default());
    let (graph, init) = elementwise_chain(4);

    let data = profiler
        .profile(&graph, &init, Device::Gpu, &["time"])
        .unwrap();
    assert_eq!(data.device(), Device::Gpu);
    assert!(data.whole_program_time_ms() > 0.0);
    assert_eq!(stats.lock().unwrap().live_allocations(), 0);
}

#[test]
fn test_metric_validation() {
    let model = CostModel::new();
    let (graph, init) = elementwise_chain(4);

    let err = model
        .profile_measure(&graph, &init, Device::Cpu, &["time", "flops"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::UnsupportedMetric(ref m) if m == "flops"));
    assert!(err.is_user_error());

    let none: [&str; 0] = [];
    let err = model
        .profile_measure(&graph, &init, Device::Cpu, &none)
        .unwrap_err();
    assert!(matches!(err, CostModelError::EmptyMetricSet));
}

#[test]
fn test_failed_op_releases_everything() {
    let (registry, stats) = dummy_registry(Device::Cpu, Duration::ZERO, Some("scale"));
    let profiler = Profiler::with_registry(registry, ProfilerConfig::default());
    let (graph, init) = elementwise_chain(8);

    let err = profiler
        .profile(&graph, &init, Device::Cpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::ExecutionFailed(_)));

    let stats = stats.lock().unwrap();
    assert_eq!(stats.alloc_count, 4);
    assert_eq!(stats.live_allocations(), 0);
    assert_eq!(stats.executed_ops, vec!["fill_constant", "abs", "relu", "scale"]);
}

#[test]
fn test_kernel_error_surfaces_as_execution_failure() {
    // matmul with mismatched inner dimensions
    let mut graph = ProgramGraph::new();
    let a = graph.add_tensor(TensorDesc::f32("a", vec![2, 3]));
    let b = graph.add_tensor(TensorDesc::f32("b", vec![4, 5]));
    let c = graph.add_tensor(TensorDesc::f32("c", vec![2, 5]));
    graph.add_node(Op::MatMul, vec![a, b], vec![c]);

    let err = Profiler::default()
        .profile(&graph, &ProgramGraph::new(), Device::Cpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::ExecutionFailed(ref m) if m.contains("matmul")));
}

#[test]
fn test_init_graph_layout_conflict() {
    let (graph, _) = elementwise_chain(8);
    let mut init = ProgramGraph::new();
    let x = init.add_tensor(TensorDesc::f32("x", vec![4, 4]));
    init.add_node(Op::FillConstant { value: 1.0 }, vec![], vec![x]);

    let err = Profiler::default()
        .profile(&graph, &init, Device::Cpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::InvalidGraph(_)));
}

#[test]
fn test_unregistered_device() {
    let profiler = Profiler::with_registry(DeviceRegistry::new(), ProfilerConfig::default());
    let err = profiler
        .profile(&ProgramGraph::new(), &ProgramGraph::new(), Device::Cpu, &["time"])
        .unwrap_err();
    assert!(matches!(err, CostModelError::DeviceUnavailable(_)));
}
