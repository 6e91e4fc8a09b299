//! Node allocatable analysis CLI
//!
//! A command-line tool for analyzing captured node allocatable logs:
//! per-cluster statistics, threshold classification, threshold sweeps and
//! one-off reservation lookups.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use allocatable_lib::{AnalysisMetrics, PolicyKind, SweepAxis};
use commands::{analyze, classify, reserve, sweep};

/// Default input, the file the log capture job writes
const DEFAULT_LOG_PATH: &str = "foreachmaster.log";

/// Node allocatable analysis CLI
#[derive(Parser)]
#[command(name = "allocatable")]
#[command(author, version, about = "Node Allocatable Analyzer", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, env = "ALLOCATABLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Reservation policy (overrides config file and environment)
    #[arg(long)]
    pub policy: Option<PolicyArg>,

    /// Write Prometheus metrics in text format to this file after the run
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-cluster reservation and overage statistics
    Analyze {
        /// Log file to analyze
        #[arg(long, short, default_value = DEFAULT_LOG_PATH)]
        path: PathBuf,

        /// Also write the per-cluster rows to this CSV file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Only list clusters whose overage is covered by their reservation
        #[arg(long)]
        bounded_only: bool,
    },

    /// Classify clusters and nodes against utilization thresholds
    Classify {
        /// Log file to analyze
        #[arg(long, short, default_value = DEFAULT_LOG_PATH)]
        path: PathBuf,

        /// Memory threshold in percent
        #[arg(long)]
        memory_threshold: Option<u64>,

        /// CPU threshold in percent
        #[arg(long)]
        cpu_threshold: Option<u64>,

        /// Also list every node with its label
        #[arg(long)]
        nodes: bool,
    },

    /// Sweep a threshold over 0..100 and write distribution tables
    Sweep {
        /// Log file to analyze
        #[arg(long, short, default_value = DEFAULT_LOG_PATH)]
        path: PathBuf,

        /// Threshold that moves
        #[arg(long, default_value = "cpu")]
        axis: AxisArg,

        /// Value of the threshold that stays fixed
        #[arg(long, default_value_t = 0)]
        fixed: u64,

        /// Directory for the CSV tables
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Evaluate threshold pairs in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Show the reservation for one node shape
    Reserve {
        /// Allocatable memory (e.g. 16Gi)
        #[arg(long)]
        memory: String,

        /// Allocatable CPU (e.g. 4 or 3500m)
        #[arg(long)]
        cpu: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Marginal-rate brackets
    Marginal,
    /// Legacy fixed amount per tier
    Step,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Marginal => PolicyKind::Marginal,
            PolicyArg::Step => PolicyKind::Step,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AxisArg {
    Cpu,
    Memory,
    Both,
}

impl From<AxisArg> for SweepAxis {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Cpu => SweepAxis::Cpu,
            AxisArg::Memory => SweepAxis::Memory,
            AxisArg::Both => SweepAxis::Both,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for tables, JSON and CSV
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = config::Overrides {
        policy: cli.policy.map(PolicyKind::from),
        ..Default::default()
    };

    match cli.command {
        Commands::Analyze {
            path,
            output,
            bounded_only,
        } => {
            let config = config::load(cli.config.as_deref(), overrides)?;
            analyze::run(&path, output.as_deref(), bounded_only, &config, cli.format)?;
        }
        Commands::Classify {
            path,
            memory_threshold,
            cpu_threshold,
            nodes,
        } => {
            let overrides = config::Overrides {
                memory_threshold,
                cpu_threshold,
                ..overrides
            };
            let config = config::load(cli.config.as_deref(), overrides)?;
            classify::run(&path, nodes, &config, cli.format)?;
        }
        Commands::Sweep {
            path,
            axis,
            fixed,
            output_dir,
            parallel,
        } => {
            let config = config::load(cli.config.as_deref(), overrides)?;
            let options = sweep::SweepOptions {
                axis: axis.into(),
                fixed,
                output_dir,
                parallel,
            };
            sweep::run(&path, options, &config, cli.format).await?;
        }
        Commands::Reserve { memory, cpu } => {
            let config = config::load(cli.config.as_deref(), overrides)?;
            reserve::run(&memory, &cpu, &config, cli.format)?;
        }
    }

    if let Some(metrics_path) = &cli.metrics_out {
        let text = AnalysisMetrics::new()
            .encode_text()
            .context("Failed to encode metrics")?;
        std::fs::write(metrics_path, text).with_context(|| {
            format!("Failed to write metrics to {}", metrics_path.display())
        })?;
        tracing::info!(path = %metrics_path.display(), "Wrote metrics exposition");
    }

    Ok(())
}
