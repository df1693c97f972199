// Public modules
pub mod assembler;
pub mod config;
pub mod db;
pub mod dedup;
pub mod email;
pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod quality;
pub mod ranker;
pub mod sources;
pub mod summarizer;

// Re-export commonly used types
pub use assembler::{Assembly, FallbackPolicy, SelectionBatch};
pub use config::Config;
pub use db::Database;
pub use extractor::{ContentFetch, HttpFetcher};
pub use models::{Candidate, RawMetrics, Source, SummarizedItem};
pub use pipeline::{run_pipeline, PipelineResult};
pub use quality::QualityScore;
