use std::fmt;
use std::io;

use thiserror::Error;

use crate::data::QualityReport;
use crate::types::SourceId;

/// Fatal error type for parameter validation, source access, and empty populations.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// Parameters cannot produce a positive sampling interval or sample size.
    #[error("invalid sampling parameter '{parameter}': {reason}")]
    InvalidParameters {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The source is missing, malformed, or changed between passes.
    #[error("population source '{source_id}' is unreadable: {reason}")]
    UnreadableSource {
        /// Identifier of the source.
        source_id: SourceId,
        /// Underlying failure.
        reason: String,
    },
    /// No row survived cleaning and filtering.
    #[error(
        "population is empty after applying filters ({} raw rows, {} cleaned)",
        quality.total_rows_raw,
        quality.total_rows_cleaned
    )]
    EmptyPopulation {
        /// Counters of the run that came up empty.
        quality: Box<QualityReport>,
    },
    /// Output could not be written.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SamplingError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn unreadable(source_id: impl Into<SourceId>, reason: impl fmt::Display) -> Self {
        Self::UnreadableSource {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Quality snapshot attached to the failure, when one was captured.
    pub fn quality_report(&self) -> Option<&QualityReport> {
        match self {
            Self::EmptyPopulation { quality } => Some(quality),
            _ => None,
        }
    }
}

/// Field names that a row can be missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordField {
    /// `transaction_id` column.
    TransactionId,
    /// `amount` column.
    Amount,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionId => f.write_str("transaction_id"),
            Self::Amount => f.write_str("amount"),
        }
    }
}

/// Per-row data-quality defect recorded while cleaning.
///
/// Exclusionary defects drop the row; the rest are informational and only
/// show up as counters in the [`QualityReport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RowDefect {
    /// A required field is empty or absent.
    #[error("missing required field '{0}'")]
    MissingField(RecordField),
    /// Amount text is not a number.
    #[error("amount is not a parseable decimal")]
    InvalidAmount,
    /// Informational.
    #[error("effective date does not match an accepted format")]
    InvalidDate,
    /// Informational.
    #[error("transaction id already seen in this run")]
    DuplicateId,
    /// Zero amount while zeros are excluded.
    #[error("zero amount excluded")]
    ExcludedByAmount,
    /// Side not admitted by the balance type filter.
    #[error("balance side excluded by balance type filter")]
    ExcludedByBalance,
}

impl RowDefect {
    /// Whether this defect removes the row from the sampling population.
    pub fn is_exclusionary(&self) -> bool {
        !matches!(self, Self::InvalidDate | Self::DuplicateId)
    }
}
