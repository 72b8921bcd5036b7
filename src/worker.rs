use crate::error::ThresherError;
use crate::metrics::Throughput;
use crate::retry::{retry, retry_with};
use crate::tokenize::tokenize;
use crate::transport::{Frame, PullSocket, PushSocket};
use std::net::SocketAddr;
use std::time::Duration;

/// Stateless tokenizer worker: pull one sentence, tokenize, push the token
/// list downstream. Workers are interchangeable and can be scaled to any
/// count >= 1. Exhausting the receive retry budget is fatal to this worker
/// only; the rest of the pool keeps running.
pub struct Worker {
    id: usize,
    ventilator_addr: SocketAddr,
    collector_addr: SocketAddr,
    tries: usize,
    metric_interval: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        ventilator_addr: SocketAddr,
        collector_addr: SocketAddr,
        tries: usize,
        metric_interval: Duration,
    ) -> Self {
        Worker {
            id,
            ventilator_addr,
            collector_addr,
            tries,
            metric_interval,
        }
    }

    pub fn run(self) -> Result<(), ThresherError> {
        // The ventilator may not have bound yet when the pool starts, so
        // connection establishment retries on transport errors.
        let mut receiver = retry_with(
            self.tries,
            "worker connect ventilator",
            |e| matches!(e, ThresherError::Transport(_)),
            || PullSocket::<String>::connect(self.ventilator_addr),
        )?;
        let mut sender = retry_with(
            self.tries,
            "worker connect collector",
            |e| matches!(e, ThresherError::Transport(_)),
            || PushSocket::<Vec<String>>::connect(self.collector_addr),
        )?;
        let mut meter = Throughput::new(format!("worker-{}", self.id), self.metric_interval);
        loop {
            match retry(self.tries, "worker recv", || receiver.try_recv()) {
                Ok(Frame::Item(sentence)) => {
                    let tokens = tokenize(&sentence);
                    sender.send(&Frame::Item(tokens))?;
                    meter.notify(1);
                }
                Ok(Frame::Close) => {
                    tracing::debug!(worker = self.id, processed = meter.total(), "upstream closed");
                    return sender.close();
                }
                Err(err) => {
                    // Exhausted retries: forward the close so the collector
                    // does not wait on this producer forever.
                    sender.close().ok();
                    return Err(err);
                }
            }
        }
    }
}
