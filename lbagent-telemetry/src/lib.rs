//! CPU time sampling for the lbagent agent-check responder.
//!
//! [`collect::cpu`] reads cumulative CPU time from the kernel and
//! [`load::idle_weight`] turns two such snapshots into the weight reported to
//! the load balancer.

pub mod collect;
pub mod load;
pub mod logging;

pub use collect::cpu::{CpuError, CpuStats, CpuTimeSource, CpuTimes, ProcStatSource};
pub use load::idle_weight;
pub use logging::{LogConfig, LogFormat, init_logging};
