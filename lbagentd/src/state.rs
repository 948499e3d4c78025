//! Shared sample buffer.
//!
//! The sampler, the status file poller and every connection go through the
//! single lock in [`AgentState`]. Connections keep it for their whole reply,
//! status file read included, so replies and sampling are fully serialized.

use lbagent_telemetry::{CpuTimes, idle_weight};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Two CPU snapshots, the most recent and the one before it.
///
/// A fresh buffer holds the startup snapshot as current and all-zero counters
/// as previous, so the first reply reports the idle share since boot.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    slots: [CpuTimes; 2],
    active: usize,
    reporting: bool,
}

impl SampleBuffer {
    /// Buffer seeded with the startup snapshot.
    ///
    /// `reporting` starts out false so the first connection looks at the
    /// status file before the poller has had a chance to.
    pub fn new(initial: CpuTimes) -> Self {
        Self {
            slots: [initial, CpuTimes::default()],
            active: 0,
            reporting: false,
        }
    }

    /// Store a new snapshot in the stale slot and make it current.
    pub fn record(&mut self, sample: CpuTimes) {
        let next = 1 - self.active;
        self.slots[next] = sample;
        self.active = next;
    }

    /// Index of the slot written last.
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn current(&self) -> &CpuTimes {
        &self.slots[self.active]
    }

    pub fn previous(&self) -> &CpuTimes {
        &self.slots[1 - self.active]
    }

    /// Whether replies carry the CPU weight rather than a forced state.
    pub fn is_reporting(&self) -> bool {
        self.reporting
    }

    pub fn set_reporting(&mut self, reporting: bool) {
        self.reporting = reporting;
    }

    /// Idle weight between the previous and current snapshot.
    pub fn idle_weight(&self, ticks_per_second: f64) -> u32 {
        idle_weight(self.previous(), self.current(), ticks_per_second)
    }
}

/// State shared by the background tasks and the connection handlers.
#[derive(Debug)]
pub struct AgentState {
    buffer: Mutex<SampleBuffer>,
    status_file: PathBuf,
    ticks_per_second: f64,
}

impl AgentState {
    pub fn new(
        initial: CpuTimes,
        status_file: impl Into<PathBuf>,
        ticks_per_second: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            buffer: Mutex::new(SampleBuffer::new(initial)),
            status_file: status_file.into(),
            ticks_per_second,
        })
    }

    /// Acquire the one lock guarding the buffer and the reporting flag.
    pub async fn lock(&self) -> MutexGuard<'_, SampleBuffer> {
        self.buffer.lock().await
    }

    pub fn status_file(&self) -> &Path {
        &self.status_file
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }
}
