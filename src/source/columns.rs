use csv::StringRecord;
use std::collections::HashMap;

use crate::constants::source::{COLUMN_ALIASES, UTF8_BOM};
use crate::data::RawRecord;
use crate::errors::SamplingError;
use crate::types::RowIndex;
use crate::utils::canonical_header_name;

/// Column positions of the fixed header contract.
///
/// Built once per read from the header row; maps each data row into a
/// [`RawRecord`] without carrying untyped maps further.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    transaction_id: usize,
    amount: usize,
    effective_date: Option<usize>,
    document_type: Option<usize>,
    description: Option<usize>,
    balance_side: Option<usize>,
}

impl ColumnMap {
    /// Resolve column positions from a header row.
    ///
    /// Headers are canonicalized and passed through the alias table; the first
    /// occurrence of a canonical name wins. Fails when `transaction_id` or
    /// `amount` cannot be found.
    pub fn from_headers(source_id: &str, headers: &StringRecord) -> Result<Self, SamplingError> {
        let mut positions: HashMap<&'static str, usize> = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let canonical = canonical_header_name(header.trim_start_matches(UTF8_BOM));
            let Some((_, mapped)) = COLUMN_ALIASES
                .iter()
                .find(|(alias, _)| *alias == canonical)
            else {
                continue;
            };
            positions.entry(*mapped).or_insert(idx);
        }
        let required = |name: &'static str| {
            positions.get(name).copied().ok_or_else(|| {
                SamplingError::unreadable(
                    source_id,
                    format!("missing required column '{name}'"),
                )
            })
        };
        Ok(Self {
            transaction_id: required("transaction_id")?,
            amount: required("amount")?,
            effective_date: positions.get("effective_date").copied(),
            document_type: positions.get("document_type").copied(),
            description: positions.get("description").copied(),
            balance_side: positions.get("balance_side").copied(),
        })
    }

    /// Map one data row onto the fixed record shape.
    ///
    /// Short rows leave trailing fields empty.
    pub fn record(&self, row_index: RowIndex, row: &StringRecord) -> RawRecord {
        let cell = |idx: usize| row.get(idx).map(str::to_string);
        RawRecord {
            row_index,
            transaction_id: cell(self.transaction_id),
            amount: cell(self.amount),
            effective_date: self.effective_date.and_then(cell),
            document_type: self.document_type.and_then(cell),
            description: self.description.and_then(cell),
            balance_side: self.balance_side.and_then(cell),
        }
    }
}
