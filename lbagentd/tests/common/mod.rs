use lbagent_telemetry::{CpuError, CpuTimeSource, CpuTimes};
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .json(),
            )
            .with(filter)
            .init();
    });
}

/// CPU source whose n-th sample (from 0) is `base + n * step`.
///
/// Steps are multiples of 1/4 second so every weight is computed exactly.
pub struct LinearSource {
    base: CpuTimes,
    step: CpuTimes,
    calls: AtomicU32,
}

impl LinearSource {
    pub fn new(base: CpuTimes, step: CpuTimes) -> Self {
        Self {
            base,
            step,
            calls: AtomicU32::new(0),
        }
    }
}

impl CpuTimeSource for LinearSource {
    fn sample(&self) -> Result<CpuTimes, CpuError> {
        let n = f64::from(self.calls.fetch_add(1, Ordering::SeqCst));
        Ok(CpuTimes {
            user: self.base.user + n * self.step.user,
            nice: self.base.nice + n * self.step.nice,
            system: self.base.system + n * self.step.system,
            idle: self.base.idle + n * self.step.idle,
            iowait: self.base.iowait + n * self.step.iowait,
            irq: self.base.irq + n * self.step.irq,
            softirq: self.base.softirq + n * self.step.softirq,
            steal: self.base.steal + n * self.step.steal,
        })
    }

    fn ticks_per_second(&self) -> f64 {
        100.0
    }
}

/// Startup counters 1s user / 3s idle (75% since boot), then every sample
/// adds 0.75s user and 0.25s idle (25% between samples).
#[allow(dead_code)]
pub fn boot_then_busy() -> LinearSource {
    LinearSource::new(
        CpuTimes {
            user: 1.0,
            idle: 3.0,
            ..Default::default()
        },
        CpuTimes {
            user: 0.75,
            idle: 0.25,
            ..Default::default()
        },
    )
}
