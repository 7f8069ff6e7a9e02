/// Transaction identifier as it appears in the population feed.
/// Examples: `T1`, `JE-2024-000183`
pub type TransactionId = String;
/// Identifier for the population source, used in logs and error context.
/// Examples: `population.csv`, `/data/gl_2024.csv`, `in_memory`
pub type SourceId = String;
/// Zero-based data row position within the source (header excluded).
pub type RowIndex = u64;
/// Unique run identifier used to correlate logs and run summaries.
/// Example: `3f1d7c2e-2f0a-4c44-9d55-0b8c1e0f6a21`
pub type RunId = String;
/// Raw text cell value before cleaning.
/// Examples: `1,000.00`, `(250.00)`, `$ 75`
pub type RawValue = String;
