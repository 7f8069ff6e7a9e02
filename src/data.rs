use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BalanceType;
use crate::constants::sampler::{SELECTION_HIGH_VALUE, SELECTION_RANDOM};

pub use crate::types::{RawValue, RowIndex, TransactionId};

/// One input row mapped onto the fixed column contract.
///
/// Fields are the untrimmed cell text; `None` means the column is absent from
/// the header. Validation happens once, in the cleaner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-based data row position within the source.
    pub row_index: RowIndex,
    /// Transaction id cell.
    pub transaction_id: Option<RawValue>,
    /// Amount cell, possibly with currency symbols and separators.
    pub amount: Option<RawValue>,
    /// Effective date cell.
    pub effective_date: Option<RawValue>,
    /// Document type cell.
    pub document_type: Option<RawValue>,
    /// Description cell.
    pub description: Option<RawValue>,
    /// Explicit debit/credit marker column, when the feed carries one.
    pub balance_side: Option<RawValue>,
}

impl RawRecord {
    /// Convenience constructor for the two required fields.
    pub fn new(row_index: RowIndex, transaction_id: &str, amount: &str) -> Self {
        Self {
            row_index,
            transaction_id: Some(transaction_id.to_string()),
            amount: Some(amount.to_string()),
            ..Self::default()
        }
    }

    /// Attach an effective date cell.
    pub fn with_effective_date(mut self, value: &str) -> Self {
        self.effective_date = Some(value.to_string());
        self
    }

    /// Attach a document type cell.
    pub fn with_document_type(mut self, value: &str) -> Self {
        self.document_type = Some(value.to_string());
        self
    }

    /// Attach a description cell.
    pub fn with_description(mut self, value: &str) -> Self {
        self.description = Some(value.to_string());
        self
    }

    /// Attach an explicit balance side cell.
    pub fn with_balance_side(mut self, value: &str) -> Self {
        self.balance_side = Some(value.to_string());
        self
    }
}

/// Debit/credit classification of a transaction.
///
/// Derived from the amount sign (positive is debit, negative is credit) unless
/// the feed carries an explicit marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSide {
    /// Positive amount or a debit marker.
    Debit,
    /// Negative amount or a credit marker.
    Credit,
    /// Zero amount with no marker; only the `both` filter admits it.
    Zero,
}

impl BalanceSide {
    /// Classify a signed amount.
    pub fn from_amount(amount: Decimal) -> Self {
        if amount > Decimal::ZERO {
            Self::Debit
        } else if amount < Decimal::ZERO {
            Self::Credit
        } else {
            Self::Zero
        }
    }

    /// Parse an explicit marker such as `D`, `Dr`, `debit`, `C`, `Cr`, `credit`.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim().to_ascii_lowercase().as_str() {
            "d" | "dr" | "debit" => Some(Self::Debit),
            "c" | "cr" | "credit" => Some(Self::Credit),
            _ => None,
        }
    }

    /// Whether the balance type filter admits this side.
    pub fn admitted_by(&self, balance_type: BalanceType) -> bool {
        match balance_type {
            BalanceType::Both => true,
            BalanceType::Debit => *self == Self::Debit,
            BalanceType::Credit => *self == Self::Credit,
        }
    }
}

impl fmt::Display for BalanceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debit => f.write_str("debit"),
            Self::Credit => f.write_str("credit"),
            Self::Zero => f.write_str("zero"),
        }
    }
}

/// A validated transaction ready for sampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CleanedTransaction {
    /// Trimmed, non-empty transaction id.
    pub transaction_id: TransactionId,
    /// Signed amount as parsed from the feed.
    pub amount: Decimal,
    /// `None` when the cell was missing or unparseable.
    pub effective_date: Option<NaiveDateTime>,
    /// Document type, if present.
    pub document_type: Option<String>,
    /// Free-text description, if present.
    pub description: Option<String>,
    /// Side used by the balance type filter.
    pub balance_side: BalanceSide,
    /// Source row this transaction was cleaned from.
    pub row_index: RowIndex,
}

impl CleanedTransaction {
    /// Absolute amount, the basis of every stratum and coverage computation.
    pub fn amount_abs(&self) -> Decimal {
        self.amount.abs()
    }
}

/// How an item entered the sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    /// Absolute amount above the interval; always selected.
    #[serde(rename = "High Value")]
    HighValue,
    /// Drawn from the remainder.
    #[serde(rename = "Random")]
    Random,
}

impl SelectionType {
    /// Report label for this selection type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighValue => SELECTION_HIGH_VALUE,
            Self::Random => SELECTION_RANDOM,
        }
    }
}

/// Data-quality counters accumulated during one cleaning pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Rows read from the source.
    pub total_rows_raw: u64,
    /// Rows that passed every exclusionary rule.
    pub total_rows_cleaned: u64,
    /// Rows rejected for a missing transaction id.
    pub missing_transaction_id: u64,
    /// Rows with an empty or null amount cell.
    pub missing_amount: u64,
    /// Kept rows without an effective date.
    pub missing_effective_date: u64,
    /// Kept rows without a document type.
    pub missing_document_type: u64,
    /// Kept rows without a description.
    pub missing_description: u64,
    /// Rows rejected because the amount is not a number.
    pub invalid_amount_format: u64,
    /// Kept rows whose date matched no accepted format.
    pub invalid_date_format: u64,
    /// Kept rows repeating an earlier transaction id.
    pub duplicate_transaction_ids: u64,
    /// Rows dropped because their amount is zero and zeros are excluded.
    pub excluded_due_to_amount: u64,
    /// Rows dropped by the balance type filter.
    pub excluded_due_to_balance: u64,
    /// Free-form warnings attached when the report is finalized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Summary metrics describing the final sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleStatistics {
    /// Cleaned items eligible for sampling.
    pub population_size: u64,
    /// Sum of absolute amounts over the population.
    pub population_balance_abs: Decimal,
    /// Interval used for the high-value split.
    pub sampling_interval: Decimal,
    /// Items selected as high value.
    pub high_value_count: u64,
    /// Items drawn from the remainder.
    pub random_sample_count: u64,
    /// Sum of absolute amounts over the whole sample.
    pub coverage_abs: Decimal,
    /// `100 * coverage_abs / population_balance_abs`, 0 for a zero balance.
    pub coverage_percent: f64,
}

/// Output of one sampling run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Every item above the interval, in population order.
    pub high_value_items: Vec<CleanedTransaction>,
    /// Randomly drawn remainder items, in population order.
    pub random_items: Vec<CleanedTransaction>,
    /// Aggregates over the population and the sample.
    pub statistics: SampleStatistics,
}

impl SampleResult {
    /// Iterate the combined sample (high value first) with selection labels.
    pub fn selections(&self) -> impl Iterator<Item = (SelectionType, &CleanedTransaction)> {
        self.high_value_items
            .iter()
            .map(|txn| (SelectionType::HighValue, txn))
            .chain(
                self.random_items
                    .iter()
                    .map(|txn| (SelectionType::Random, txn)),
            )
    }

    /// Total number of selected items.
    pub fn sample_size(&self) -> usize {
        self.high_value_items.len() + self.random_items.len()
    }
}
