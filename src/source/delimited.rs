use csv::{ReaderBuilder, Trim};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::constants::source::READER_SOURCE_ID;
use crate::errors::SamplingError;
use crate::source::{ColumnMap, PopulationSource, RecordIter};
use crate::transport::fs::{FileFingerprint, file_fingerprint, is_regular_file, open_population_file};
use crate::types::SourceId;

/// Read a header row plus data rows from `reader` as [`RawRecord`](crate::data::RawRecord)s.
///
/// Rows may be shorter or longer than the header; cells are kept untrimmed.
fn read_records<'a, R: Read + 'a>(
    source_id: &str,
    reader: R,
) -> Result<RecordIter<'a>, SamplingError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| SamplingError::unreadable(source_id, err))?
        .clone();
    let columns = ColumnMap::from_headers(source_id, &headers)?;
    let source_id = source_id.to_string();
    Ok(Box::new(reader.into_records().enumerate().map(
        move |(idx, row)| {
            row.map(|row| columns.record(idx as u64, &row))
                .map_err(|err| SamplingError::unreadable(source_id.as_str(), err))
        },
    )))
}

/// CSV file on disk, re-opened for every pass.
///
/// The file's size and modification time are captured on the first read;
/// a later read of a changed file fails instead of mixing two datasets.
#[derive(Clone, Debug)]
pub struct CsvFileSource {
    id: SourceId,
    path: PathBuf,
    fingerprint: Option<FileFingerprint>,
}

impl CsvFileSource {
    /// Create a source for `path`. Nothing is opened until the first read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: path.display().to_string(),
            path,
            fingerprint: None,
        }
    }

    /// Path this source reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PopulationSource for CsvFileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_reopen(&self) -> bool {
        is_regular_file(&self.path)
    }

    fn records(&mut self) -> Result<RecordIter<'_>, SamplingError> {
        let file = open_population_file(&self.path)?;
        let current = file_fingerprint(&self.path);
        match (self.fingerprint, current) {
            (Some(previous), Some(current)) if previous != current => {
                return Err(SamplingError::unreadable(
                    self.id.as_str(),
                    "file changed since the previous read",
                ));
            }
            (None, current) => self.fingerprint = current,
            _ => {}
        }
        read_records(&self.id, file)
    }
}

/// CSV over any seekable reader; rewound to the start on every pass.
#[derive(Debug)]
pub struct CsvReaderSource<R> {
    id: SourceId,
    reader: R,
}

impl<R: Read + Seek> CsvReaderSource<R> {
    /// Wrap a seekable reader positioned anywhere; reads always start at offset 0.
    pub fn new(reader: R) -> Self {
        Self {
            id: READER_SOURCE_ID.to_string(),
            reader,
        }
    }

    /// Override the source identifier.
    pub fn with_id(mut self, id: impl Into<SourceId>) -> Self {
        self.id = id.into();
        self
    }

    /// Recover the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> PopulationSource for CsvReaderSource<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_reopen(&self) -> bool {
        true
    }

    fn records(&mut self) -> Result<RecordIter<'_>, SamplingError> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|err| SamplingError::unreadable(self.id.as_str(), err))?;
        read_records(&self.id, &mut self.reader)
    }
}

/// CSV over a forward-only reader (a pipe, a socket, stdin).
///
/// Can be read exactly once, so it only suits in-memory sampling.
#[derive(Debug)]
pub struct OneShotCsvSource<R> {
    id: SourceId,
    reader: Option<R>,
}

impl<R: Read> OneShotCsvSource<R> {
    /// Wrap a forward-only reader.
    pub fn new(reader: R) -> Self {
        Self {
            id: READER_SOURCE_ID.to_string(),
            reader: Some(reader),
        }
    }

    /// Override the source identifier.
    pub fn with_id(mut self, id: impl Into<SourceId>) -> Self {
        self.id = id.into();
        self
    }
}

impl<R: Read> PopulationSource for OneShotCsvSource<R> {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_reopen(&self) -> bool {
        false
    }

    fn records(&mut self) -> Result<RecordIter<'_>, SamplingError> {
        let reader = self.reader.take().ok_or_else(|| {
            SamplingError::unreadable(self.id.as_str(), "source has already been read")
        })?;
        read_records(&self.id, reader)
    }
}
