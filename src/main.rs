use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use flowrun_rs::engine::{FnObserver, NodeStatus, NodeUpdate, RunMode, RunSummary};
use flowrun_rs::flow::config::{
    EngineConfig, ENV_FAILURE_RATE, ENV_FLOWS_DIR, ENV_SEED, ENV_STEP_DELAY_MS,
};
use flowrun_rs::flow::invokers::SimulatedInvoker;
use flowrun_rs::flow::server;
use flowrun_rs::flow::workflow::graph::{order, validate, FlowRunner};
use flowrun_rs::flow::workflow::history::{format_execution_time, ExecutionRecord};
use flowrun_rs::flow::workflow::loader::FlowLoader;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a flow with simulated node operations
    Run {
        /// Path to the flow file
        #[arg(short, long)]
        file: PathBuf,

        /// static: every node in order; dynamic: one path from the start node
        #[arg(short, long, default_value = "static")]
        mode: RunMode,

        /// Print the execution record as JSON
        #[arg(long)]
        json: bool,

        /// Pause between nodes, in milliseconds
        #[arg(long, env = ENV_STEP_DELAY_MS)]
        step_delay_ms: Option<u64>,

        /// Probability that a simulated operation fails
        #[arg(long, env = ENV_FAILURE_RATE)]
        failure_rate: Option<f64>,

        /// Seed for reproducible simulated runs
        #[arg(long, env = ENV_SEED)]
        seed: Option<u64>,
    },
    /// Check that a flow can run
    Validate {
        /// Path to the flow file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the order a static run would use
    Order {
        /// Path to the flow file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Directory holding flow files
        #[arg(long, env = ENV_FLOWS_DIR)]
        flows_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;
    let loader = FlowLoader::new();

    match args.command {
        Commands::Run {
            file,
            mode,
            json,
            step_delay_ms,
            failure_rate,
            seed,
        } => {
            if let Some(ms) = step_delay_ms {
                config.step_delay = Duration::from_millis(ms);
            }
            if let Some(rate) = failure_rate {
                config.simulation.failure_rate = rate;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            config.validate()?;

            let flow = loader
                .load_flow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;

            if mode == RunMode::Static {
                let report = validate(&flow.nodes, &flow.edges);
                if !report.valid {
                    bail!(report.message);
                }
            }

            log::info!(
                "Running flow {} ({} nodes, {} mode)",
                flow.display_name(),
                flow.nodes.len(),
                mode
            );

            let invoker = Arc::new(SimulatedInvoker::new(config.simulation.clone()));
            let runner = FlowRunner::new(invoker).with_step_delay(config.step_delay);

            let mut observer = FnObserver::new(
                move |update: &NodeUpdate| {
                    if !json {
                        print_update(update);
                    }
                },
                |summary: &RunSummary| {
                    log::info!(
                        "Run complete: {} succeeded, {} failed",
                        summary.success_count,
                        summary.error_count
                    );
                },
            );

            let start = Utc::now();
            let summary = runner
                .run(mode, &flow.nodes, &flow.edges, &mut observer)
                .await;
            let record = ExecutionRecord::new(&flow, &summary, start, Utc::now());

            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!(
                    "\n{}: {} of {} node(s) succeeded, {} failed in {} ({})",
                    record.flow_name,
                    record.success_count,
                    record.total_nodes,
                    record.error_count,
                    format_execution_time(record.execution_time),
                    record.status.as_str()
                );
                for result in &record.results {
                    match &result.error {
                        Some(error) => println!("  x {}: {}", result.node_id, error),
                        None => println!("  + {}", result.node_id),
                    }
                }
            }
        }
        Commands::Validate { file } => {
            let flow = loader
                .load_flow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let report = validate(&flow.nodes, &flow.edges);
            println!("{}", report.message);
            if !report.valid {
                std::process::exit(1);
            }
        }
        Commands::Order { file } => {
            let flow = loader
                .load_flow(&file)
                .with_context(|| format!("Failed to load {}", file.display()))?;
            let order = order(&flow.nodes, &flow.edges);

            for (position, node) in order.nodes().iter().enumerate() {
                let marker = if position < order.covered() { ' ' } else { '!' };
                println!("{}{:>3}. {} ({})", marker, position + 1, node.id, node.label());
            }
            println!(
                "{} of {} node(s) ordered by dependencies{}",
                order.covered(),
                order.len(),
                if order.used_fallback_seed() {
                    "; no node was free of dependencies"
                } else {
                    ""
                }
            );
        }
        Commands::Serve { port, flows_dir } => {
            if let Some(dir) = flows_dir {
                config.flows_dir = dir;
            }
            server::serve(config, port).await?;
        }
    }

    Ok(())
}

fn print_update(update: &NodeUpdate) {
    match (update.status, &update.error_message) {
        (NodeStatus::Error, Some(message)) => {
            println!("[{}] {}: {}", update.status, update.node_id, message)
        }
        (NodeStatus::Pending, Some(message)) => {
            println!("[skipped] {}: {}", update.node_id, message)
        }
        (NodeStatus::Pending, None) => {}
        _ => println!("[{}] {}", update.status, update.node_id),
    }
}
