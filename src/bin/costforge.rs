use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use costforge::logging::init_logging_default;
use costforge::program::{Op, ProgramGraph, TensorDesc};
use costforge::{CostModel, CostModelConfig, Device, ProfilerConfig};

#[derive(Parser, Debug)]
#[command(name = "costforge", version)]
#[command(about = "Look up and measure operator costs", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the benchmarked time of an operator
    Lookup {
        /// Operator name, e.g. conv2d
        op: String,
        /// Look up the backward (gradient) kernel
        #[arg(long)]
        backward: bool,
        /// Element type; "default" uses the database default
        #[arg(long, default_value = "default")]
        dtype: String,
        /// Benchmark JSON file (defaults to COSTFORGE_STATIC_DB or the embedded dataset)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List operators in the static database
    Ops {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Profile a small fully-connected network
    Bench {
        /// Hidden size of each layer
        #[arg(long, default_value_t = 256)]
        size: usize,
        /// Number of matmul + add + relu layers
        #[arg(long, default_value_t = 4)]
        layers: usize,
        /// Comma-separated metrics
        #[arg(long, value_delimiter = ',', default_value = "time")]
        metrics: Vec<String>,
        /// cpu or gpu
        #[arg(long, default_value = "cpu")]
        device: String,
        /// Untimed runs before measuring
        #[arg(long)]
        warmup: Option<usize>,
    },
}

fn model_config(db: Option<PathBuf>) -> CostModelConfig {
    let config = CostModelConfig::from_env();
    match db {
        Some(path) => config.with_static_db(path),
        None => config,
    }
}

/// Build `layers` x (matmul, elementwise_add, relu) plus the init graph
/// filling inputs, weights and biases.
fn mlp_graphs(size: usize, layers: usize) -> (ProgramGraph, ProgramGraph) {
    let mut init = ProgramGraph::new();
    let mut graph = ProgramGraph::new();

    let x = TensorDesc::f32("x", vec![size, size]);
    let init_x = init.add_tensor(x.clone());
    init.add_node(Op::FillConstant { value: 0.5 }, vec![], vec![init_x]);
    let mut current = graph.add_tensor(x);

    for layer in 0..layers {
        let w = TensorDesc::f32(format!("w{}", layer), vec![size, size]);
        let b = TensorDesc::f32(format!("b{}", layer), vec![size]);
        for (desc, value) in [(&w, 0.01), (&b, 0.1)] {
            let id = init.add_tensor(desc.clone());
            init.add_node(Op::FillConstant { value }, vec![], vec![id]);
        }

        let w = graph.add_tensor(w);
        let b = graph.add_tensor(b);
        let h = graph.add_tensor(TensorDesc::f32(format!("h{}", layer), vec![size, size]));
        let z = graph.add_tensor(TensorDesc::f32(format!("z{}", layer), vec![size, size]));
        let a = graph.add_tensor(TensorDesc::f32(format!("a{}", layer), vec![size, size]));

        graph.add_node(Op::MatMul, vec![current, w], vec![h]);
        graph.add_node(Op::ElementwiseAdd, vec![h, b], vec![z]);
        graph.add_node(Op::Relu, vec![z], vec![a]);
        current = a;
    }

    (graph, init)
}

fn main() -> anyhow::Result<()> {
    init_logging_default();
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Lookup {
            op,
            backward,
            dtype,
            db,
        } => {
            let model = CostModel::with_config(model_config(db));
            let time = model
                .get_static_op_time(&op, !backward, &dtype)
                .with_context(|| format!("lookup of '{}' failed", op))?;

            if cli.json {
                serde_json::to_writer_pretty(&mut stdout, &time)?;
                writeln!(stdout)?;
            } else {
                writeln!(stdout, "{}: {:.4} ms", time.config, time.op_time)?;
                writeln!(stdout, "  {}", time.source_config)?;
            }
        }
        Commands::Ops { db } => {
            let model = CostModel::with_config(model_config(db));
            let database = model.static_database();
            let operators = database.operators()?;

            if cli.json {
                serde_json::to_writer_pretty(&mut stdout, &operators)?;
                writeln!(stdout)?;
            } else {
                for op in operators {
                    let configs: Vec<String> = database
                        .configurations(&op)?
                        .into_iter()
                        .map(|(direction, dtype)| format!("{}/{}", direction, dtype))
                        .collect();
                    writeln!(stdout, "{:<20} {}", op, configs.join(" "))?;
                }
            }
        }
        Commands::Bench {
            size,
            layers,
            metrics,
            device,
            warmup,
        } => {
            let device: Device = device.parse()?;
            let mut config = CostModelConfig::from_env();
            if let Some(runs) = warmup {
                config = config.with_profiler(ProfilerConfig::new().with_warmup_runs(runs));
            }
            let model = CostModel::with_config(config);

            let (graph, init) = mlp_graphs(size, layers);
            let data = model
                .profile_measure(&graph, &init, device, &metrics)
                .context("profiling failed")?;

            if cli.json {
                serde_json::to_writer_pretty(&mut stdout, &data)?;
                writeln!(stdout)?;
            } else {
                data.write_report(&mut stdout)?;
            }
        }
    }

    Ok(())
}
