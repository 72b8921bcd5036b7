use std::time::{Duration, Instant};

/// Throughput meter attached to each long-running loop. `notify` adds to the
/// running counts and, once per reporting interval, logs the window count and
/// rate, then resets the window. An interval of zero disables reporting.
pub struct Throughput {
    name: String,
    interval: Duration,
    window: u64,
    total: u64,
    last_report: Instant,
}

impl Throughput {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Throughput {
            name: name.into(),
            interval,
            window: 0,
            total: 0,
            last_report: Instant::now(),
        }
    }

    pub fn notify(&mut self, n: u64) {
        self.window += n;
        self.total += n;
        if self.interval.is_zero() {
            return;
        }
        let elapsed = self.last_report.elapsed();
        if elapsed >= self.interval {
            let rate = self.window as f64 / elapsed.as_secs_f64();
            tracing::info!(
                name = %self.name,
                window = self.window,
                total = self.total,
                rate = format_args!("{:.1}/s", rate),
                "throughput"
            );
            self.window = 0;
            self.last_report = Instant::now();
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
