//! lbagentd - HAProxy agent-check responder
//!
//! Started through socket activation; answers each probe with a forced state
//! from the status file or the host's CPU idle weight.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use lbagent_telemetry::{LogConfig, ProcStatSource, init_logging};
use lbagentd::config::{DEFAULT_STATUS_FILE, STATUS_FILE_ENV};
use lbagentd::{Agent, AgentConfig, activation};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lbagentd")]
#[command(author, version, about = "HAProxy agent-check responder reporting CPU idle weight")]
struct Cli {
    /// Specify healthcheck status file
    #[arg(short = 'f', long = "file", env = STATUS_FILE_ENV, default_value = DEFAULT_STATUS_FILE)]
    status_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_env("info").with_stderr())?;

    let config = AgentConfig::new(cli.status_file);
    info!(path = %config.status_file.display(), "Healthcheck status file set");

    let listener =
        activation::take_listener().context("cannot retrieve socket-activated listener")?;
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "Listening for agent checks"),
        Err(e) => warn!(error = %e, "Listening for agent checks on unknown address"),
    }

    let source = ProcStatSource::new().context("cannot set up CPU sampling")?;
    let agent = Agent::start(&config, Arc::new(source))
        .context("cannot take initial CPU sample")?;

    agent.serve(listener, shutdown_signal()).await;
    info!("lbagentd stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Cannot install SIGTERM handler, relying on Ctrl-C only");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = terminate.recv() => info!("Received SIGTERM"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received SIGINT"),
            Err(e) => {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                terminate.recv().await;
            }
        },
    }
}
