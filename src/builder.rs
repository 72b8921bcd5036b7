use crate::aggregator::{IndexAggregator, WordAggregator};
use crate::artifact::{self, ArtifactSet};
use crate::corpus;
use crate::error::ThresherError;
use crate::negative::negative_sampling_table;
use crate::pool::StagePool;
use crate::ventilator::Ventilator;
use crate::vocab::{FrequencyTable, RESERVED_WORDS, Vocabulary, WordCounter, build_vocabulary};
use crate::worker::Worker;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const INDEX_PROGRESS_EVERY: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub corpus_files: Vec<PathBuf>,
    pub artifacts: ArtifactSet,
    pub workers: usize,
    pub top_words: usize,
    pub ip: IpAddr,
    pub ventilator_port: u16,
    pub collector_port: u16,
    /// Receive attempt budget per blocking receive; 0 disables retry.
    pub tries: usize,
    pub metric_interval: Duration,
    pub overwrite: bool,
}

impl BuildConfig {
    /// Checked before any thread is spawned: configuration errors abort with
    /// no partial pipeline to clean up.
    pub fn validate(&self) -> Result<(), ThresherError> {
        if self.corpus_files.is_empty() {
            return Err(ThresherError::Config("no corpus files given".to_string()));
        }
        if self.workers == 0 {
            return Err(ThresherError::Config("workers must be >= 1".to_string()));
        }
        if self.top_words <= RESERVED_WORDS.len() {
            return Err(ThresherError::Config(format!(
                "top_words must be larger than {}",
                RESERVED_WORDS.len()
            )));
        }
        if self.ventilator_port == self.collector_port {
            return Err(ThresherError::Config(
                "ventilator and collector ports must differ".to_string(),
            ));
        }
        Ok(())
    }

    fn ventilator_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.ventilator_port)
    }

    fn collector_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.collector_port)
    }
}

#[derive(Debug)]
pub struct BuildSummary {
    pub vocabulary_size: usize,
    pub data_index_len: usize,
    pub negative_len: usize,
}

/// Two-phase orchestrator. Phase 1 streams the corpus through the worker
/// pool into the word aggregator and persists the vocabulary. Phase 2
/// re-streams the corpus through a fresh pool and concurrently builds the
/// data index and the negative-sampling table. Each phase owns a fresh
/// ventilator + worker set; the aggregators run in this process.
pub struct DataBuilder {
    config: BuildConfig,
}

impl DataBuilder {
    pub fn new(config: BuildConfig) -> Result<Self, ThresherError> {
        config.validate()?;
        Ok(DataBuilder { config })
    }

    fn start_stage(&self, prefix: &str) -> Result<StagePool, ThresherError> {
        let mut pool = StagePool::new();
        let ventilator = Ventilator::new(
            self.config.ventilator_addr(),
            self.config.workers,
            self.config.metric_interval,
        );
        let files = self.config.corpus_files.clone();
        pool.spawn(format!("{}-ventilator", prefix), move || {
            ventilator.run(corpus::sentences(files))
        })?;
        for i in 0..self.config.workers {
            let worker = Worker::new(
                i,
                self.config.ventilator_addr(),
                self.config.collector_addr(),
                self.config.tries,
                self.config.metric_interval,
            );
            pool.spawn(format!("{}-worker-{}", prefix, i), move || worker.run())?;
        }
        Ok(pool)
    }

    /// Phase 1: count every word in the corpus and rank the vocabulary.
    pub fn build_vocabulary(&self) -> Result<(Vocabulary, FrequencyTable), ThresherError> {
        tracing::info!("begin building vocabulary");
        let aggregator = WordAggregator::bind(
            self.config.collector_addr(),
            self.config.workers,
            self.config.tries,
            self.config.metric_interval,
        )?;
        let pool = self.start_stage("vocab")?;
        let mut counter = WordCounter::new();
        counter.extend(aggregator);
        let failed = pool.join();
        if failed > 0 {
            tracing::warn!(failed, "stage members failed during the vocabulary pass");
        }
        tracing::info!(
            distinct = counter.distinct(),
            total = counter.total(),
            "finished counting"
        );
        build_vocabulary(counter, self.config.top_words)
    }

    /// Run both phases and persist all three artifacts.
    pub fn build(&self) -> Result<BuildSummary, ThresherError> {
        let (vocabulary, frequency) = self.build_vocabulary()?;
        artifact::save(
            &vocabulary,
            &self.config.artifacts.vocabulary,
            self.config.overwrite,
        )?;
        tracing::info!(
            size = vocabulary.len(),
            path = %self.config.artifacts.vocabulary.display(),
            "vocabulary saved"
        );

        tracing::info!("begin building data index and negative table");
        let aggregator = IndexAggregator::bind(
            self.config.collector_addr(),
            &vocabulary,
            self.config.workers,
            self.config.tries,
            self.config.metric_interval,
        )?;
        let pool = self.start_stage("data")?;
        // The table build is CPU-bound and the index drain is network-bound;
        // they share no state, so a scoped thread overlaps them.
        let (data_index, negative) =
            std::thread::scope(|s| -> Result<(Vec<u32>, Vec<u32>), ThresherError> {
                let table = s.spawn(|| negative_sampling_table(&frequency));
                let data_index = drain_data_index(aggregator);
                let negative = table
                    .join()
                    .map_err(|_| ThresherError::Other("negative table build panicked".to_string()))?;
                Ok((data_index, negative))
            })?;
        let failed = pool.join();
        if failed > 0 {
            tracing::warn!(failed, "stage members failed during the data pass");
        }

        artifact::save(
            &data_index,
            &self.config.artifacts.data_index,
            self.config.overwrite,
        )?;
        artifact::save(
            &negative,
            &self.config.artifacts.negative,
            self.config.overwrite,
        )?;
        tracing::info!(
            data_index_len = data_index.len(),
            negative_len = negative.len(),
            "data index and negative table saved"
        );

        Ok(BuildSummary {
            vocabulary_size: vocabulary.len(),
            data_index_len: data_index.len(),
            negative_len: negative.len(),
        })
    }
}

fn drain_data_index(aggregator: IndexAggregator<'_>) -> Vec<u32> {
    let mut data_index = Vec::new();
    let mut received = 0u64;
    for ids in aggregator {
        data_index.extend(ids);
        received += 1;
        if received % INDEX_PROGRESS_EVERY == 0 {
            tracing::info!(received, len = data_index.len(), "data index progress");
        }
    }
    data_index
}
