//! HAProxy agent-check responder.
//!
//! Every probe connection gets one line: a forced server state taken from the
//! status file, or the host's CPU idle weight computed from the two latest
//! samples.

pub mod activation;
pub mod config;
pub mod overrides;
pub mod poller;
pub mod responder;
pub mod sampler;
pub mod server;
pub mod state;

pub use config::AgentConfig;
pub use overrides::OverrideState;
pub use responder::Reply;
pub use server::Agent;
pub use state::{AgentState, SampleBuffer};
