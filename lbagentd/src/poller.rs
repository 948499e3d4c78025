//! Status file watcher.
//!
//! Re-arms the status file check by clearing `reporting` whenever the file
//! exists, and switches to plain weight reporting whenever it does not.

use crate::overrides::override_exists;
use crate::state::AgentState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Background task polling for the presence of the status file.
pub struct OverridePoller {
    state: Arc<AgentState>,
    interval: Duration,
}

impl OverridePoller {
    pub fn new(state: Arc<AgentState>, interval: Duration) -> Self {
        Self { state, interval }
    }

    /// Check the status file once and update the flag. Returns the new value.
    pub async fn poll_once(&self) -> bool {
        let mut buffer = self.state.lock().await;
        let reporting = !override_exists(self.state.status_file()).await;
        if buffer.is_reporting() != reporting {
            debug!(
                path = %self.state.status_file().display(),
                reporting,
                "Status file presence changed"
            );
        }
        buffer.set_reporting(reporting);
        reporting
    }

    /// Spawn the polling loop. The first check runs immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                interval = ?self.interval,
                path = %self.state.status_file().display(),
                "Status file poller started"
            );

            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }
}
