#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command line runner behind the `audit-sample` binary.
pub mod app;
/// Row validation, normalization, and quality accounting.
pub mod cleaner;
/// Sampling parameters and policies.
pub mod config;
/// Centralized constants used across cleaner, sources, samplers, and reports.
pub mod constants;
/// Record, transaction, and sample result types.
pub mod data;
/// Sampling interval derivation.
pub mod interval;
/// Sample statistics helpers.
pub mod metrics;
/// Sample CSV export and JSON run summaries.
pub mod report;
/// In-memory and streaming samplers.
pub mod sampler;
/// Population source trait and built-in sources.
pub mod source;
/// Input transports used by sources (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use cleaner::{Cleaner, clean_source};
pub use config::{BalanceType, SampleSizePolicy, SamplingParameters};
pub use data::{
    BalanceSide, CleanedTransaction, QualityReport, RawRecord, SampleResult, SampleStatistics,
    SelectionType,
};
pub use errors::{RecordField, RowDefect, SamplingError};
pub use interval::sampling_interval;
pub use metrics::build_statistics;
pub use report::{RunSummary, SamplingMode, write_run_summary, write_sample_report};
pub use sampler::{
    NoProgress, ProgressEvent, ProgressSink, StreamPass, sample_in_memory, sample_population,
    sample_streaming,
};
pub use source::{CsvFileSource, CsvReaderSource, InMemorySource, OneShotCsvSource, PopulationSource};
pub use types::{RawValue, RowIndex, RunId, SourceId, TransactionId};
