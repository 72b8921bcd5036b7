pub mod aggregator;
pub mod artifact;
pub mod builder;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod negative;
pub mod pool;
pub mod retry;
pub mod tokenize;
pub mod transport;
pub mod ventilator;
pub mod vocab;
pub mod worker;

pub use builder::{BuildConfig, BuildSummary, DataBuilder};
pub use error::ThresherError;
pub use vocab::{FrequencyTable, Vocabulary};
