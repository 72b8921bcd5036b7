use crate::error::ThresherError;
use crate::metrics::Throughput;
use crate::transport::{Frame, PushListener, PushSocket};
use std::net::SocketAddr;
use std::time::Duration;

/// Single producer feeding the worker pool. Binds the distribution endpoint,
/// waits for the expected workers, then streams each sentence to whichever
/// worker is next in the fair-queue rotation. No acknowledgment is awaited
/// and sends are not retried. On input exhaustion every peer gets a close
/// sentinel, so the phase winds down deterministically.
pub struct Ventilator {
    addr: SocketAddr,
    expected_workers: usize,
    metric_interval: Duration,
}

impl Ventilator {
    pub fn new(addr: SocketAddr, expected_workers: usize, metric_interval: Duration) -> Self {
        Ventilator {
            addr,
            expected_workers,
            metric_interval,
        }
    }

    pub fn run<I>(self, sentences: I) -> Result<(), ThresherError>
    where
        I: Iterator<Item = Result<String, ThresherError>>,
    {
        let listener = PushListener::bind(self.addr)?;
        tracing::info!(addr = %self.addr, workers = self.expected_workers, "ventilator waiting for workers");
        let mut sock: PushSocket<String> = listener.accept(self.expected_workers)?;
        let mut meter = Throughput::new("ventilator", self.metric_interval);
        for sentence in sentences {
            sock.send(&Frame::Item(sentence?))?;
            meter.notify(1);
        }
        tracing::info!(sent = meter.total(), "corpus exhausted, closing distribution endpoint");
        sock.close()
    }
}
