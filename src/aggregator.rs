use crate::error::ThresherError;
use crate::metrics::Throughput;
use crate::retry::retry;
use crate::transport::{Frame, PullSocket};
use crate::vocab::Vocabulary;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

/// Bound collection endpoint yielding token lists from the worker pool.
/// The stream ends after one `Close` per producer has been counted, or when
/// the receive retry budget is exhausted (logged, not propagated; by then
/// the pipeline is already winding down and the caller judges completeness).
pub struct TokenStream {
    sock: PullSocket<Vec<String>>,
    expected_closes: usize,
    closes_seen: usize,
    tries: usize,
    meter: Throughput,
    done: bool,
}

impl TokenStream {
    pub fn bind(
        name: &str,
        addr: SocketAddr,
        producers: usize,
        tries: usize,
        metric_interval: Duration,
    ) -> Result<Self, ThresherError> {
        let sock = PullSocket::bind(addr)?;
        tracing::info!(name, addr = %addr, producers, "collector bound");
        Ok(TokenStream {
            sock,
            expected_closes: producers,
            closes_seen: 0,
            tries,
            meter: Throughput::new(name, metric_interval),
            done: false,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ThresherError> {
        self.sock.local_addr()
    }
}

impl Iterator for TokenStream {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match retry(self.tries, "collector recv", || self.sock.try_recv()) {
                Ok(Frame::Item(tokens)) => {
                    self.meter.notify(1);
                    return Some(tokens);
                }
                Ok(Frame::Close) => {
                    self.closes_seen += 1;
                    if self.closes_seen >= self.expected_closes {
                        self.done = true;
                        tracing::info!(
                            received = self.meter.total(),
                            producers = self.expected_closes,
                            "all producers closed, collection finished"
                        );
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "collector receive failed, ending stream");
                    self.done = true;
                }
            }
        }
        None
    }
}

/// Flattens token lists into individual words, dropping zero-length tokens.
/// Feeds the frequency counter in the vocabulary pass.
pub struct WordAggregator {
    stream: TokenStream,
    pending: VecDeque<String>,
}

impl WordAggregator {
    pub fn bind(
        addr: SocketAddr,
        producers: usize,
        tries: usize,
        metric_interval: Duration,
    ) -> Result<Self, ThresherError> {
        let stream = TokenStream::bind("word_aggregator", addr, producers, tries, metric_interval)?;
        Ok(WordAggregator {
            stream,
            pending: VecDeque::new(),
        })
    }
}

impl Iterator for WordAggregator {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(word) = self.pending.pop_front() {
                return Some(word);
            }
            let tokens = self.stream.next()?;
            self.pending
                .extend(tokens.into_iter().filter(|t| !t.is_empty()));
        }
    }
}

/// Maps each received token list through a read-only vocabulary, unknown
/// words to the reserved unk id. Feeds the data-index pass.
pub struct IndexAggregator<'v> {
    stream: TokenStream,
    vocabulary: &'v Vocabulary,
}

impl<'v> IndexAggregator<'v> {
    pub fn bind(
        addr: SocketAddr,
        vocabulary: &'v Vocabulary,
        producers: usize,
        tries: usize,
        metric_interval: Duration,
    ) -> Result<Self, ThresherError> {
        let stream =
            TokenStream::bind("index_aggregator", addr, producers, tries, metric_interval)?;
        Ok(IndexAggregator { stream, vocabulary })
    }
}

impl Iterator for IndexAggregator<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let tokens = self.stream.next()?;
        Some(ids_for(self.vocabulary, &tokens))
    }
}

pub fn ids_for(vocabulary: &Vocabulary, tokens: &[String]) -> Vec<u32> {
    tokens.iter().map(|t| vocabulary.id_or_unk(t)).collect()
}
