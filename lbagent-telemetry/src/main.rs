//! CPU sampling diagnostics for lbagent hosts.
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lbagent_telemetry::{
    CpuStats, CpuTimeSource, LogConfig, ProcStatSource, idle_weight, init_logging,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "lbagent-telemetry", version, about = "CPU sampling diagnostics for lbagent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample twice and print the weight an agent-check would report
    Weight {
        /// Sampling window in milliseconds
        #[arg(long, default_value_t = 1000)]
        sample_ms: u64,

        /// Compare against the all-zero baseline instead of sampling twice
        #[arg(long)]
        since_boot: bool,
    },
    /// Print the aggregate CPU counters in clock ticks
    Stat {
        /// Alternative file in /proc/stat format
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("warn").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Weight {
            sample_ms,
            since_boot,
        } => {
            let source =
                ProcStatSource::new().context("failed to set up /proc/stat source")?;
            let weight = sample_weight(&source, sample_ms, since_boot)?;
            println!("{weight}% ");
        }
        Commands::Stat { path } => {
            let stats = match path {
                Some(path) => CpuStats::read_from(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => CpuStats::read_from_proc()?,
            };
            println!(
                "user={} nice={} system={} idle={} iowait={} irq={} softirq={} steal={}",
                stats.user,
                stats.nice,
                stats.system,
                stats.idle,
                stats.iowait,
                stats.irq,
                stats.softirq,
                stats.steal
            );
        }
    }

    Ok(())
}

fn sample_weight(source: &dyn CpuTimeSource, sample_ms: u64, since_boot: bool) -> Result<u32> {
    let prev = if since_boot {
        Default::default()
    } else {
        let first = source.sample()?;
        std::thread::sleep(Duration::from_millis(sample_ms));
        first
    };
    let cur = source.sample()?;

    let weight = idle_weight(&prev, &cur, source.ticks_per_second());
    debug!(weight, sample_ms, since_boot, "Idle weight sampled");
    Ok(weight)
}
