//! Idle-weight calculation.
//!
//! Turns two chronologically ordered CPU snapshots into the integer weight an
//! agent-check reports: the rounded percentage of time the CPUs spent idle
//! between the samples. A host with more spare capacity reports a higher
//! weight.
//!
//! The arithmetic follows procps `vmstat`. `steal` is not scaled by the tick
//! rate.

use crate::collect::cpu::CpuTimes;

/// Compute the idle-time percentage between `prev` and `cur`.
///
/// Returns 100 when no time elapsed between the samples.
pub fn idle_weight(prev: &CpuTimes, cur: &CpuTimes, ticks_per_second: f64) -> u32 {
    let duse = (cur.user - prev.user + cur.nice - prev.nice) * ticks_per_second;
    let dsys = (cur.system - prev.system + cur.irq - prev.irq + cur.softirq - prev.softirq)
        * ticks_per_second;
    let mut didl = (cur.idle - prev.idle) * ticks_per_second;
    let diow = (cur.iowait - prev.iowait) * ticks_per_second;
    let dstl = cur.steal - prev.steal;

    let mut div = duse + dsys + didl + diow + dstl;
    if div == 0.0 {
        div = 1.0;
        didl = 1.0;
    }

    // Saturating cast: negative values become 0. Counters that go backwards
    // (iowait may) can also push the result above 100; it is not clamped.
    ((100.0 * didl + div / 2.0) / div).floor() as u32
}
