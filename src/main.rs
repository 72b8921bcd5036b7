use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thresher::artifact::ArtifactSet;
use thresher::{BuildConfig, DataBuilder, ThresherError};

#[derive(Parser)]
#[command(name = "thresher")]
#[command(about = "Build embedding-training data from a raw text corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the two-phase pipeline: vocabulary, then data index + negative table
    Build {
        /// Corpus files, one sentence per line
        #[arg(required = true)]
        corpus: Vec<PathBuf>,
        /// Directory the three artifacts are written into
        #[arg(long, default_value = "./w2v_data")]
        out_dir: PathBuf,
        /// Tokenizer worker count
        #[arg(long, default_value_t = 1)]
        workers: usize,
        /// Vocabulary size cap, including the three reserved tokens
        #[arg(long, default_value_t = 100_000)]
        top_words: usize,
        /// Address both pipeline endpoints bind on
        #[arg(long, default_value = "127.0.0.1")]
        ip: IpAddr,
        #[arg(long, default_value_t = 5555)]
        ventilator_port: u16,
        #[arg(long, default_value_t = 5556)]
        collector_port: u16,
        /// Receive attempts before a loop gives up; 0 disables retry
        #[arg(long, default_value_t = 40)]
        tries: usize,
        /// Seconds between throughput reports
        #[arg(long, default_value_t = 10)]
        metric_interval_secs: u64,
        /// Replace existing artifacts
        #[arg(long)]
        overwrite: bool,
    },
    /// Load the persisted artifacts and print a summary
    Inspect {
        #[arg(long, default_value = "./w2v_data")]
        out_dir: PathBuf,
        /// How many top-ranked words to show
        #[arg(long, default_value_t = 10)]
        head: usize,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), ThresherError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Build {
            corpus,
            out_dir,
            workers,
            top_words,
            ip,
            ventilator_port,
            collector_port,
            tries,
            metric_interval_secs,
            overwrite,
        } => {
            let artifacts = ArtifactSet::in_dir(&out_dir);
            let config = BuildConfig {
                corpus_files: corpus,
                artifacts: artifacts.clone(),
                workers,
                top_words,
                ip,
                ventilator_port,
                collector_port,
                tries,
                metric_interval: Duration::from_secs(metric_interval_secs),
                overwrite,
            };
            let summary = DataBuilder::new(config)?.build()?;
            println!(
                "vocabulary: {} entries -> {}",
                summary.vocabulary_size,
                artifacts.vocabulary.display()
            );
            println!(
                "data index: {} ids -> {}",
                summary.data_index_len,
                artifacts.data_index.display()
            );
            println!(
                "negative table: {} ids -> {}",
                summary.negative_len,
                artifacts.negative.display()
            );
        }
        Commands::Inspect { out_dir, head, json } => {
            let summary = ArtifactSet::in_dir(&out_dir).load_summary(head)?;
            if json {
                let rendered = serde_json::to_string_pretty(&summary)
                    .map_err(|e| ThresherError::Other(e.to_string()))?;
                println!("{}", rendered);
            } else {
                println!("vocabulary size: {}", summary.vocabulary_size);
                println!("data index length: {}", summary.data_index_len);
                println!("negative table length: {}", summary.negative_len);
                println!("top ranked: {}", summary.top_ranked.iter().join(", "));
            }
        }
    }
    Ok(())
}
