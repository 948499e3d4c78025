//! CPU time collection from /proc/stat.
//!
//! Reads the aggregate `cpu` line of Linux /proc/stat and exposes it as a
//! snapshot of cumulative CPU time, the input of the idle-weight calculation.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Default location of the kernel CPU statistics.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Errors that can occur during CPU time collection.
#[derive(Error, Debug)]
pub enum CpuError {
    #[error("failed to read /proc/stat: {0}")]
    ReadStatError(#[from] std::io::Error),

    #[error("failed to parse /proc/stat: {0}")]
    ParseError(String),

    #[error("failed to query clock ticks per second: {0}")]
    ClockTicks(String),
}

/// Raw CPU statistics parsed from /proc/stat.
///
/// All values are in clock ticks (typically 1/100 second) since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStats {
    /// Time spent in user mode.
    pub user: u64,
    /// Time spent in user mode with low priority (nice).
    pub nice: u64,
    /// Time spent in system mode.
    pub system: u64,
    /// Time spent idle.
    pub idle: u64,
    /// Time waiting for I/O to complete.
    pub iowait: u64,
    /// Time spent servicing hardware interrupts.
    pub irq: u64,
    /// Time spent servicing software interrupts.
    pub softirq: u64,
    /// Time stolen by other operating systems (virtualization).
    pub steal: u64,
}

impl CpuStats {
    /// Read CPU statistics from /proc/stat.
    pub fn read_from_proc() -> Result<Self, CpuError> {
        Self::read_from(Path::new(PROC_STAT_PATH))
    }

    /// Read CPU statistics from a file in /proc/stat format.
    pub fn read_from(path: &Path) -> Result<Self, CpuError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse /proc/stat content for aggregate CPU stats.
    ///
    /// Format: `cpu user nice system idle iowait irq softirq steal guest guest_nice`
    pub fn parse(content: &str) -> Result<Self, CpuError> {
        for line in content.lines() {
            // Only the aggregate "cpu " line, not "cpu0", "cpu1", ...
            if line.starts_with("cpu ") {
                return Self::parse_cpu_line(line);
            }
        }
        Err(CpuError::ParseError(
            "no aggregate cpu line found in /proc/stat".to_string(),
        ))
    }

    fn parse_cpu_line(line: &str) -> Result<Self, CpuError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Minimum required fields: cpu user nice system idle
        if parts.len() < 5 {
            return Err(CpuError::ParseError(format!(
                "cpu line too short: expected at least 5 fields, got {}",
                parts.len()
            )));
        }

        let parse_field = |idx: usize| -> Result<u64, CpuError> {
            match parts.get(idx) {
                None => Ok(0),
                Some(raw) => raw.parse().map_err(|_| {
                    CpuError::ParseError(format!("invalid counter in field {idx}: '{raw}'"))
                }),
            }
        };

        Ok(Self {
            user: parse_field(1)?,
            nice: parse_field(2)?,
            system: parse_field(3)?,
            idle: parse_field(4)?,
            iowait: parse_field(5)?,
            irq: parse_field(6)?,
            softirq: parse_field(7)?,
            steal: parse_field(8)?,
        })
    }

    /// Convert tick counters into seconds.
    pub fn to_times(&self, ticks_per_second: f64) -> CpuTimes {
        let secs = |ticks: u64| ticks as f64 / ticks_per_second;
        CpuTimes {
            user: secs(self.user),
            nice: secs(self.nice),
            system: secs(self.system),
            idle: secs(self.idle),
            iowait: secs(self.iowait),
            irq: secs(self.irq),
            softirq: secs(self.softirq),
            steal: secs(self.steal),
        }
    }
}

/// Cumulative CPU time since boot, in seconds.
///
/// The all-zero value stands in for "no earlier sample" and is what a fresh
/// sample buffer is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
}

/// Query the kernel's clock ticks per second (`USER_HZ`, usually 100).
pub fn clock_ticks_per_second() -> Result<f64, CpuError> {
    use nix::unistd::{SysconfVar, sysconf};

    match sysconf(SysconfVar::CLK_TCK) {
        Ok(Some(hz)) if hz > 0 => Ok(hz as f64),
        Ok(Some(hz)) => Err(CpuError::ClockTicks(format!("non-positive value {hz}"))),
        Ok(None) => Err(CpuError::ClockTicks("_SC_CLK_TCK is unsupported".to_string())),
        Err(e) => Err(CpuError::ClockTicks(e.to_string())),
    }
}

/// Source of cumulative CPU time snapshots.
pub trait CpuTimeSource: Send + Sync {
    /// Capture the current cumulative CPU times.
    fn sample(&self) -> Result<CpuTimes, CpuError>;

    /// Clock ticks per second, fixed for the lifetime of the source.
    fn ticks_per_second(&self) -> f64;
}

/// [`CpuTimeSource`] backed by /proc/stat.
#[derive(Debug, Clone)]
pub struct ProcStatSource {
    path: PathBuf,
    ticks_per_second: f64,
}

impl ProcStatSource {
    /// Source reading the system /proc/stat, with the tick rate queried once.
    pub fn new() -> Result<Self, CpuError> {
        let ticks_per_second = clock_ticks_per_second()?;
        debug!(ticks_per_second, "Clock ticks per second resolved");
        Ok(Self::with_path(PROC_STAT_PATH, ticks_per_second))
    }

    /// Source reading an arbitrary file in /proc/stat format.
    pub fn with_path(path: impl Into<PathBuf>, ticks_per_second: f64) -> Self {
        Self {
            path: path.into(),
            ticks_per_second,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CpuTimeSource for ProcStatSource {
    fn sample(&self) -> Result<CpuTimes, CpuError> {
        let stats = CpuStats::read_from(&self.path)?;
        trace!(
            user = stats.user,
            system = stats.system,
            idle = stats.idle,
            iowait = stats.iowait,
            "CPU stats sampled"
        );
        Ok(stats.to_times(self.ticks_per_second))
    }

    fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }
}
