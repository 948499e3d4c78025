//! Periodic CPU sampling into the shared buffer.

use crate::state::AgentState;
use lbagent_telemetry::{CpuError, CpuTimeSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

/// Background task refreshing the sample buffer on a fixed cadence.
pub struct Sampler {
    state: Arc<AgentState>,
    source: Arc<dyn CpuTimeSource>,
    interval: Duration,
}

impl Sampler {
    pub fn new(state: Arc<AgentState>, source: Arc<dyn CpuTimeSource>, interval: Duration) -> Self {
        Self {
            state,
            source,
            interval,
        }
    }

    /// Take one sample and rotate it into the buffer.
    ///
    /// On failure the buffer is left exactly as it was.
    pub async fn sample_once(&self) -> Result<(), CpuError> {
        let mut buffer = self.state.lock().await;
        let sample = self.source.sample()?;
        buffer.record(sample);
        debug!(active = buffer.active_index(), "CPU sample recorded");
        Ok(())
    }

    /// Spawn the sampling loop.
    ///
    /// The first refresh happens one interval after start: the buffer was
    /// seeded with a startup snapshot already.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval = ?self.interval, "CPU sampler started");

            loop {
                ticker.tick().await;
                if let Err(e) = self.sample_once().await {
                    warn!(error = %e, "CPU sample failed, keeping previous samples");
                }
            }
        })
    }
}
