//! Per-connection agent-check reply.
//!
//! A probe gets exactly one line and nothing is read from it:
//! `"<state> \n"` while a valid status file is in force, `"<weight>% \n"`
//! otherwise.

use crate::overrides::{OverrideRead, OverrideState, read_override};
use crate::state::AgentState;
use std::fmt;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Line sent to the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Forced state from the status file.
    Override(OverrideState),
    /// Idle weight in percent.
    Weight(u32),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override(state) => write!(f, "{state} \n"),
            Self::Weight(weight) => write!(f, "{weight}% \n"),
        }
    }
}

/// Decide the reply and write it to `out`, all under the shared lock.
///
/// A missing, unreadable or unrecognized status file switches to weight
/// reporting until the poller sees the file again.
pub async fn respond<W>(state: &AgentState, out: &mut W) -> io::Result<Reply>
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = state.lock().await;

    if !buffer.is_reporting() {
        match read_override(state.status_file()).await {
            OverrideRead::State(forced) => {
                let reply = Reply::Override(forced);
                out.write_all(reply.to_string().as_bytes()).await?;
                return Ok(reply);
            }
            OverrideRead::Unrecognized(content) => {
                warn!(
                    path = %state.status_file().display(),
                    content = %content,
                    "Unsupported instructions in status file detected"
                );
                buffer.set_reporting(true);
            }
            OverrideRead::Unreadable(e) => {
                debug!(
                    path = %state.status_file().display(),
                    error = %e,
                    "Status file unreadable, reporting CPU weight"
                );
                buffer.set_reporting(true);
            }
        }
    }

    let reply = Reply::Weight(buffer.idle_weight(state.ticks_per_second()));
    out.write_all(reply.to_string().as_bytes()).await?;
    Ok(reply)
}

/// Answer one probe and close the connection.
pub async fn handle_connection(mut stream: TcpStream, state: &AgentState) -> io::Result<Reply> {
    let reply = respond(state, &mut stream).await?;
    stream.shutdown().await?;
    Ok(reply)
}
