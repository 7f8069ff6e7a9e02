//! Record cleaning and data-quality accounting.
//!
//! The cleaner is the single validation boundary: raw text rows come in,
//! typed [`CleanedTransaction`] values or [`RowDefect`] rejections go out, and
//! every outcome is counted in a [`QualityReport`].

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::{BalanceType, SamplingParameters};
use crate::constants::cleaner::{
    DATE_FORMATS, INVALID_AMOUNT_NOTE, INVALID_AMOUNT_WARN_RATIO, NULL_SENTINEL,
    THOUSANDS_SEPARATORS,
};
use crate::constants::events::{CLEANING_DONE, QUALITY_REPORT, RAW_LOADED};
use crate::data::{BalanceSide, CleanedTransaction, QualityReport, RawRecord};
use crate::errors::{RecordField, RowDefect, SamplingError};
use crate::source::PopulationSource;
use crate::types::TransactionId;
use crate::utils::{clean_text, has_text, passthrough_text};

/// Outcome of parsing an amount cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountParse {
    /// Empty cell or the null sentinel.
    Missing,
    /// Text present but not a number.
    Invalid,
    /// Signed amount.
    Valid(Decimal),
}

/// Outcome of parsing an effective date cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateParse {
    /// Empty cell or the null sentinel.
    Missing,
    /// Text matching none of the accepted formats.
    Invalid,
    /// Parsed timestamp; date-only formats land at midnight.
    Valid(NaiveDateTime),
}

impl DateParse {
    /// Parsed value, if any.
    pub fn value(self) -> Option<NaiveDateTime> {
        match self {
            Self::Valid(value) => Some(value),
            _ => None,
        }
    }
}

/// Parse an amount cell into a signed decimal.
///
/// Leading and trailing non-numeric symbols (currency signs, codes, spaces)
/// are stripped; a `-` among them or a surrounding `(...)` pair makes the
/// value negative. Thousands separators inside the number are dropped. The
/// number starts at its first digit, or at a bare `.` right before it.
pub fn parse_amount(raw: Option<&str>) -> AmountParse {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() || text.eq_ignore_ascii_case(NULL_SENTINEL) {
        return AmountParse::Missing;
    }

    let Some(first_digit) = text.find(|ch: char| ch.is_ascii_digit()) else {
        return AmountParse::Invalid;
    };
    let start = leading_point(text, first_digit).unwrap_or(first_digit);
    let end = text.rfind(|ch: char| ch.is_ascii_digit()).map_or(start, |idx| idx + 1);
    let (prefix, rest) = text.split_at(start);
    let (core, suffix) = rest.split_at(end - start);

    let negative = prefix.contains('-')
        || suffix.contains('-')
        || (prefix.contains('(') && suffix.contains(')'));

    let mut digits: String = core
        .chars()
        .filter(|ch| !THOUSANDS_SEPARATORS.contains(ch))
        .collect();
    if digits.starts_with('.') {
        digits.insert(0, '0');
    }
    let parsed = Decimal::from_str(&digits).or_else(|_| Decimal::from_scientific(&digits));
    match parsed {
        Ok(value) if negative => AmountParse::Valid(-value),
        Ok(value) => AmountParse::Valid(value),
        Err(_) => AmountParse::Invalid,
    }
}

/// Position of a bare decimal point directly before `first_digit`, as in `.5`
/// or `$.5`. A dot closing an abbreviation (`Rs.`, `Fr.`) is not a point.
fn leading_point(text: &str, first_digit: usize) -> Option<usize> {
    let head = text[..first_digit].strip_suffix('.')?;
    match head.chars().next_back() {
        Some(ch) if ch.is_alphabetic() || ch == '.' => None,
        _ => Some(head.len()),
    }
}

/// Parse an effective date cell against the accepted formats.
pub fn parse_date(raw: Option<&str>) -> DateParse {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() || text.eq_ignore_ascii_case(NULL_SENTINEL) {
        return DateParse::Missing;
    }
    for format in DATE_FORMATS {
        let parsed = if format.contains("%H") {
            NaiveDateTime::parse_from_str(text, format).ok()
        } else {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        };
        if let Some(value) = parsed {
            return DateParse::Valid(value);
        }
    }
    DateParse::Invalid
}

/// Amount-relevant fields of a row that passed the fast-mode screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenedAmount {
    /// Signed amount.
    pub amount: Decimal,
    /// Side after the marker column or the sign was applied.
    pub balance_side: BalanceSide,
}

/// Stateful cleaner for one run.
///
/// Owns the run's [`QualityReport`] and the set of transaction ids seen so far.
#[derive(Debug)]
pub struct Cleaner {
    balance_type: BalanceType,
    include_zeros: bool,
    report: QualityReport,
    seen_ids: HashSet<TransactionId>,
}

impl Cleaner {
    /// Create a cleaner applying the filters in `params`.
    pub fn new(params: &SamplingParameters) -> Self {
        Self {
            balance_type: params.balance_type,
            include_zeros: params.include_zeros,
            report: QualityReport::default(),
            seen_ids: HashSet::new(),
        }
    }

    /// Counters accumulated so far.
    pub fn report(&self) -> &QualityReport {
        &self.report
    }

    /// Fully validate and normalize one row.
    ///
    /// Invalid and missing dates, duplicate ids, and missing descriptive
    /// fields are counted but never reject the row.
    pub fn clean(&mut self, raw: &RawRecord) -> Result<CleanedTransaction, RowDefect> {
        self.report.total_rows_raw += 1;
        let parsed = parse_amount(raw.amount.as_deref());
        let transaction_id = self.require_fields(raw, parsed)?;
        let amount = self.require_amount(parsed)?;

        let effective_date = match parse_date(raw.effective_date.as_deref()) {
            DateParse::Missing => {
                self.report.missing_effective_date += 1;
                None
            }
            DateParse::Invalid => {
                self.report.invalid_date_format += 1;
                debug!(
                    row = raw.row_index,
                    defect = %RowDefect::InvalidDate,
                    "date recorded as quality defect"
                );
                None
            }
            DateParse::Valid(value) => Some(value),
        };
        let document_type = clean_text(raw.document_type.as_deref());
        if document_type.is_none() {
            self.report.missing_document_type += 1;
        }
        let description = clean_text(raw.description.as_deref());
        if description.is_none() {
            self.report.missing_description += 1;
        }

        if !self.seen_ids.insert(transaction_id.clone()) {
            self.report.duplicate_transaction_ids += 1;
            debug!(
                row = raw.row_index,
                transaction_id = %transaction_id,
                defect = %RowDefect::DuplicateId,
                "duplicate kept in population"
            );
        }

        let balance_side = self.apply_filters(raw, amount)?;
        self.report.total_rows_cleaned += 1;
        Ok(CleanedTransaction {
            transaction_id,
            amount,
            effective_date,
            document_type,
            description,
            balance_side,
            row_index: raw.row_index,
        })
    }

    /// Fast-mode screen: required fields, amount, and zero/balance filters only.
    ///
    /// Used on the streaming hot path. Dates, duplicates, and descriptive
    /// fields are neither validated nor counted.
    pub fn screen(&mut self, raw: &RawRecord) -> Result<ScreenedAmount, RowDefect> {
        self.report.total_rows_raw += 1;
        let parsed = parse_amount(raw.amount.as_deref());
        if !has_text(raw.transaction_id.as_deref()) {
            self.report.missing_transaction_id += 1;
            if parsed == AmountParse::Missing {
                self.report.missing_amount += 1;
            }
            return Err(RowDefect::MissingField(RecordField::TransactionId));
        }
        let amount = match parsed {
            AmountParse::Valid(value) => value,
            AmountParse::Missing => {
                self.report.missing_amount += 1;
                return Err(RowDefect::MissingField(RecordField::Amount));
            }
            AmountParse::Invalid => {
                self.report.invalid_amount_format += 1;
                return Err(RowDefect::InvalidAmount);
            }
        };
        let balance_side = self.apply_filters(raw, amount)?;
        self.report.total_rows_cleaned += 1;
        Ok(ScreenedAmount {
            amount,
            balance_side,
        })
    }

    /// Build a transaction from a screened row without validating text fields.
    ///
    /// The transaction id is trimmed; descriptive text cells are carried
    /// through as-is and the date is parsed best-effort.
    pub fn materialize(raw: &RawRecord, screened: ScreenedAmount) -> CleanedTransaction {
        CleanedTransaction {
            transaction_id: raw
                .transaction_id
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            amount: screened.amount,
            effective_date: parse_date(raw.effective_date.as_deref()).value(),
            document_type: passthrough_text(raw.document_type.as_deref()),
            description: passthrough_text(raw.description.as_deref()),
            balance_side: screened.balance_side,
            row_index: raw.row_index,
        }
    }

    /// Finalize the report, attaching notes.
    pub fn finish(self) -> QualityReport {
        let mut report = self.report;
        if report.total_rows_raw > 0 {
            let unusable = report.missing_amount + report.invalid_amount_format;
            let ratio = unusable as f64 / report.total_rows_raw as f64;
            if ratio > INVALID_AMOUNT_WARN_RATIO {
                warn!(
                    unusable_amounts = unusable,
                    total_rows = report.total_rows_raw,
                    "high share of unusable amounts"
                );
                report.notes.push(INVALID_AMOUNT_NOTE.to_string());
            }
        }
        report
    }

    fn require_fields(
        &mut self,
        raw: &RawRecord,
        amount: AmountParse,
    ) -> Result<TransactionId, RowDefect> {
        let transaction_id = clean_text(raw.transaction_id.as_deref());
        let amount_missing = amount == AmountParse::Missing;
        if amount_missing {
            self.report.missing_amount += 1;
        }
        match transaction_id {
            Some(id) if !amount_missing => Ok(id),
            Some(_) => Err(RowDefect::MissingField(RecordField::Amount)),
            None => {
                self.report.missing_transaction_id += 1;
                Err(RowDefect::MissingField(RecordField::TransactionId))
            }
        }
    }

    fn require_amount(&mut self, amount: AmountParse) -> Result<Decimal, RowDefect> {
        match amount {
            AmountParse::Valid(value) => Ok(value),
            AmountParse::Missing => Err(RowDefect::MissingField(RecordField::Amount)),
            AmountParse::Invalid => {
                self.report.invalid_amount_format += 1;
                Err(RowDefect::InvalidAmount)
            }
        }
    }

    fn apply_filters(&mut self, raw: &RawRecord, amount: Decimal) -> Result<BalanceSide, RowDefect> {
        if !self.include_zeros && amount.is_zero() {
            self.report.excluded_due_to_amount += 1;
            return Err(RowDefect::ExcludedByAmount);
        }
        let balance_side = raw
            .balance_side
            .as_deref()
            .and_then(BalanceSide::from_marker)
            .unwrap_or_else(|| BalanceSide::from_amount(amount));
        if !balance_side.admitted_by(self.balance_type) {
            self.report.excluded_due_to_balance += 1;
            return Err(RowDefect::ExcludedByBalance);
        }
        Ok(balance_side)
    }
}

/// Clean every row of `source` into a materialized population.
///
/// Rows failing an exclusionary rule are dropped and counted; the run itself
/// only fails when the source cannot be read.
pub fn clean_source(
    source: &mut dyn PopulationSource,
    params: &SamplingParameters,
) -> Result<(Vec<CleanedTransaction>, QualityReport), SamplingError> {
    let source_id = source.id().to_string();
    let mut cleaner = Cleaner::new(params);
    let mut cleaned = Vec::new();
    for record in source.records()? {
        let record = record?;
        match cleaner.clean(&record) {
            Ok(transaction) => cleaned.push(transaction),
            Err(defect) => debug!(row = record.row_index, %defect, "row dropped"),
        }
    }
    let report = cleaner.finish();
    info!(
        event = RAW_LOADED,
        source = %source_id,
        rows = report.total_rows_raw,
        "raw population read"
    );
    info!(
        event = QUALITY_REPORT,
        missing_transaction_id = report.missing_transaction_id,
        missing_amount = report.missing_amount,
        invalid_amount_format = report.invalid_amount_format,
        invalid_date_format = report.invalid_date_format,
        duplicate_transaction_ids = report.duplicate_transaction_ids,
        excluded_due_to_amount = report.excluded_due_to_amount,
        excluded_due_to_balance = report.excluded_due_to_balance,
        "data quality report"
    );
    info!(
        event = CLEANING_DONE,
        raw_rows = report.total_rows_raw,
        cleaned_rows = report.total_rows_cleaned,
        duplicates = report.duplicate_transaction_ids,
        "cleaning finished"
    );
    Ok((cleaned, report))
}
