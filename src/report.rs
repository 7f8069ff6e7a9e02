//! Sample export and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::SamplingParameters;
use crate::constants::events::{REPORT_WRITTEN, RUN_SUMMARY};
use crate::constants::report::{METHODOLOGY, RUNS_DIR, SAMPLE_FILENAME, SAMPLE_HEADERS};
use crate::data::{QualityReport, SampleResult, SampleStatistics};
use crate::errors::SamplingError;
use crate::types::RunId;
use crate::utils::round2;

const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which strategy produced a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Population cleaned and held in memory.
    InMemory,
    /// Two-pass reservoir run.
    Streaming,
}

/// Persisted record of one run: timings, inputs, and outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier used for the summary file name.
    pub run_id: RunId,
    /// Run start.
    pub started_at_utc: DateTime<Utc>,
    /// Run end.
    pub finished_at_utc: DateTime<Utc>,
    /// Seconds, rounded to two decimals (as are the phase timings below).
    pub duration_seconds: f64,
    /// Always 0 in streaming mode, where cleaning happens inside the passes.
    pub cleaning_seconds: f64,
    /// Sampling phase.
    pub sampling_seconds: f64,
    /// Report writing phase.
    pub reporting_seconds: f64,
    /// Strategy that produced the sample.
    pub mode: SamplingMode,
    /// Parameters as given.
    pub parameters: SamplingParameters,
    /// Cleaning counters.
    pub data_quality: QualityReport,
    /// Sample aggregates.
    pub sample_statistics: SampleStatistics,
    /// Number of rows in the sample report.
    pub sample_size: usize,
    /// Path of the sample CSV.
    pub output_report: PathBuf,
    /// See [`RunSummary::methodology`].
    pub methodology: String,
    /// See [`RunSummary::version`].
    pub version: String,
}

impl RunSummary {
    /// Methodology label stamped on every summary.
    pub fn methodology() -> String {
        METHODOLOGY.to_string()
    }

    /// Version of this crate, stamped on every summary.
    pub fn version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Duration in seconds rounded to two decimals.
pub fn rounded_seconds(duration: Duration) -> f64 {
    round2(duration.as_secs_f64())
}

/// Write the selected sample as CSV into `output_dir`, returning the file path.
///
/// High-value items come first, then random items, each in population order.
pub fn write_sample_report(
    output_dir: &Path,
    result: &SampleResult,
) -> Result<PathBuf, SamplingError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(SAMPLE_FILENAME);
    let file = File::create(&path)?;
    write_sample_csv(BufWriter::new(file), result)?;
    info!(
        event = REPORT_WRITTEN,
        path = %path.display(),
        rows = result.sample_size(),
        "sample report written"
    );
    Ok(path)
}

/// Write the selected sample as CSV to any writer.
pub fn write_sample_csv<W: Write>(writer: W, result: &SampleResult) -> Result<(), SamplingError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(SAMPLE_HEADERS).map_err(io::Error::from)?;
    for (selection, txn) in result.selections() {
        let row_index = txn.row_index.to_string();
        let amount = txn.amount.to_string();
        let effective_date = txn
            .effective_date
            .map(|date| date.format(DATE_OUTPUT_FORMAT).to_string())
            .unwrap_or_default();
        let balance_side = txn.balance_side.to_string();
        writer
            .write_record([
                selection.label(),
                row_index.as_str(),
                txn.transaction_id.as_str(),
                amount.as_str(),
                effective_date.as_str(),
                txn.document_type.as_deref().unwrap_or_default(),
                txn.description.as_deref().unwrap_or_default(),
                balance_side.as_str(),
            ])
            .map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

/// Persist `summary` as pretty JSON under `<output_dir>/runs/<run_id>.json`.
pub fn write_run_summary(
    output_dir: &Path,
    summary: &RunSummary,
) -> Result<PathBuf, SamplingError> {
    let runs_dir = output_dir.join(RUNS_DIR);
    fs::create_dir_all(&runs_dir)?;
    let path = runs_dir.join(format!("{}.json", summary.run_id));
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, summary).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(event = RUN_SUMMARY, path = %path.display(), "run summary written");
    Ok(path)
}
