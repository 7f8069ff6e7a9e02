use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use crate::errors::SamplingError;

/// Size and modification time of a file, used to detect changes between passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileFingerprint {
    /// Size in bytes.
    pub len: u64,
    /// `None` where the platform reports no modification time.
    pub modified: Option<DateTime<Utc>>,
}

/// True if `path` exists and is a regular file.
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Open a population file for buffered sequential reading.
pub fn open_population_file(path: &Path) -> Result<BufReader<File>, SamplingError> {
    let source_id = path.display().to_string();
    if !path.exists() {
        return Err(SamplingError::unreadable(source_id, "file does not exist"));
    }
    if !is_regular_file(path) {
        return Err(SamplingError::unreadable(source_id, "not a regular file"));
    }
    let file = File::open(path).map_err(|err| SamplingError::unreadable(source_id, err))?;
    Ok(BufReader::new(file))
}

/// Best-effort fingerprint for a file.
pub fn file_fingerprint(path: &Path) -> Option<FileFingerprint> {
    let metadata = fs::metadata(path).ok()?;
    Some(FileFingerprint {
        len: metadata.len(),
        modified: metadata.modified().ok().map(system_time_to_utc),
    })
}

fn system_time_to_utc(time: std::time::SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
