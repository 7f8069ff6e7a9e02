//! Population source interfaces.
//!
//! Ownership model:
//! - `PopulationSource` is the sampler-facing interface; every call to
//!   `records` starts a fresh sequential read from the first data row.
//! - `can_reopen` is the capability check the streaming sampler performs
//!   before its first pass. Sources that can only be read once report `false`.
//! - Rows leave a source as fixed-shape [`RawRecord`] values.

use csv::StringRecord;

use crate::constants::source::IN_MEMORY_SOURCE_ID;
use crate::data::RawRecord;
use crate::errors::SamplingError;
use crate::types::SourceId;

/// Header mapping onto the fixed column contract.
pub mod columns;
/// CSV-backed sources.
pub mod delimited;

pub use columns::ColumnMap;
pub use delimited::{CsvFileSource, CsvReaderSource, OneShotCsvSource};

/// Sequential iterator over the rows of one read.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<RawRecord, SamplingError>> + 'a>;

/// Sampler-facing population interface.
///
/// For a fixed underlying dataset, two reads must yield the same rows in the
/// same order; the streaming sampler relies on it.
pub trait PopulationSource {
    /// Identifier used in logs and error context (usually the path).
    fn id(&self) -> &str;

    /// Whether `records` may be called more than once.
    fn can_reopen(&self) -> bool;

    /// Start a new sequential read from the first data row.
    fn records(&mut self) -> Result<RecordIter<'_>, SamplingError>;
}

/// Fully materialized population of raw rows.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    id: SourceId,
    records: Vec<RawRecord>,
}

impl InMemorySource {
    /// Create an in-memory source from prebuilt records.
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            id: IN_MEMORY_SOURCE_ID.to_string(),
            records,
        }
    }

    /// Build a source from a header row plus string rows, as a caller holding
    /// already-split lines would.
    pub fn from_rows<H, R, C>(headers: &[H], rows: R) -> Result<Self, SamplingError>
    where
        H: AsRef<str>,
        R: IntoIterator<Item = Vec<C>>,
        C: AsRef<str>,
    {
        let header_record: StringRecord = headers.iter().map(AsRef::as_ref).collect();
        let columns = ColumnMap::from_headers(IN_MEMORY_SOURCE_ID, &header_record)?;
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let row: StringRecord = row.iter().map(AsRef::as_ref).collect();
                columns.record(idx as u64, &row)
            })
            .collect();
        Ok(Self::new(records))
    }

    /// Override the source identifier.
    pub fn with_id(mut self, id: impl Into<SourceId>) -> Self {
        self.id = id.into();
        self
    }

    /// Number of raw rows held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no rows are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PopulationSource for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_reopen(&self) -> bool {
        true
    }

    fn records(&mut self) -> Result<RecordIter<'_>, SamplingError> {
        Ok(Box::new(self.records.iter().cloned().map(Ok::<_, SamplingError>)))
    }
}
