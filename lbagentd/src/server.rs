//! Agent wiring: shared state, background tasks and the accept loop.

use crate::config::AgentConfig;
use crate::poller::OverridePoller;
use crate::responder::handle_connection;
use crate::sampler::Sampler;
use crate::state::AgentState;
use lbagent_telemetry::{CpuError, CpuTimeSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause after a failed accept (e.g. EMFILE).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A running agent: seeded state plus the sampler and poller tasks.
pub struct Agent {
    state: Arc<AgentState>,
    sampler: JoinHandle<()>,
    poller: JoinHandle<()>,
}

impl Agent {
    /// Seed the sample buffer and start the background tasks.
    ///
    /// Fails only when the startup snapshot cannot be taken.
    pub fn start(config: &AgentConfig, source: Arc<dyn CpuTimeSource>) -> Result<Self, CpuError> {
        let initial = source.sample()?;
        let state = AgentState::new(
            initial,
            config.status_file.clone(),
            source.ticks_per_second(),
        );

        let sampler = Sampler::new(state.clone(), source, config.sample_interval).start();
        let poller = OverridePoller::new(state.clone(), config.poll_interval).start();

        Ok(Self {
            state,
            sampler,
            poller,
        })
    }

    /// Answer probes on `listener` until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting probes");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = self.state.clone();
                        tokio::spawn(async move {
                            match handle_connection(stream, &state).await {
                                Ok(reply) => debug!(
                                    %peer,
                                    reply = %reply.to_string().trim_end(),
                                    "Probe answered"
                                ),
                                Err(e) => debug!(%peer, error = %e, "Probe connection failed"),
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept error");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        self.stop();
    }

    /// Abort the background tasks.
    pub fn stop(self) {
        self.sampler.abort();
        self.poller.abort();
        debug!("Sampler and poller stopped");
    }
}
