/// Filesystem access for population files.
pub mod fs;
