/// Constants used by the record cleaner.
pub mod cleaner {
    /// Accepted effective-date formats, tried in order (first match wins).
    pub const DATE_FORMATS: [&str; 6] = [
        "%d/%m/%Y %H:%M",
        "%m/%d/%Y %H:%M",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
    ];
    /// Sentinel text treated as an absent value (compared case-insensitively).
    pub const NULL_SENTINEL: &str = "none";
    /// Characters dropped from amounts as thousands separators.
    pub const THOUSANDS_SEPARATORS: [char; 4] = [',', '_', ' ', '\''];
    /// Share of raw rows with unusable amounts above which a note is attached.
    pub const INVALID_AMOUNT_WARN_RATIO: f64 = 0.2;
    /// Note attached when too many rows have unusable amounts.
    pub const INVALID_AMOUNT_NOTE: &str = "Warning: more than 20% of rows have invalid amounts.";
}

/// Constants used by population sources and header mapping.
pub mod source {
    /// Source id reported by in-memory populations.
    pub const IN_MEMORY_SOURCE_ID: &str = "in_memory";
    /// Default source id reported by reader-backed CSV sources.
    pub const READER_SOURCE_ID: &str = "reader";
    /// UTF-8 byte order mark stripped from the first header cell.
    pub const UTF8_BOM: char = '\u{feff}';
    /// Header aliases mapped onto canonical column names.
    ///
    /// Keys are canonicalized headers (lowercase, non-alphanumerics as `_`).
    pub const COLUMN_ALIASES: [(&str, &str); 22] = [
        ("transactionid", "transaction_id"),
        ("transaction_id", "transaction_id"),
        ("trx_id", "transaction_id"),
        ("txn_id", "transaction_id"),
        ("amount", "amount"),
        ("value", "amount"),
        ("amount_value", "amount"),
        ("amountvalue", "amount"),
        ("effective_date", "effective_date"),
        ("effectivedate", "effective_date"),
        ("date", "effective_date"),
        ("document_type", "document_type"),
        ("documenttype", "document_type"),
        ("doctype", "document_type"),
        ("doc_type", "document_type"),
        ("description", "description"),
        ("desc", "description"),
        ("memo", "description"),
        ("balance_side", "balance_side"),
        ("balanceside", "balance_side"),
        ("dr_cr", "balance_side"),
        ("debit_credit", "balance_side"),
    ];
}

/// Constants used by the samplers.
pub mod sampler {
    /// Default deterministic seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Number of rows between progress notifications in streaming mode.
    pub const PROGRESS_BATCH_ROWS: u64 = 10_000;
    /// Selection label for high-value items.
    pub const SELECTION_HIGH_VALUE: &str = "High Value";
    /// Selection label for randomly drawn items.
    pub const SELECTION_RANDOM: &str = "Random";
}

/// Structured log event codes.
pub mod events {
    /// Run parameters accepted.
    pub const RUN_START: &str = "RUN_START";
    /// Source fully read by the cleaner.
    pub const RAW_LOADED: &str = "RAW_LOADED";
    /// Quality counters after cleaning.
    pub const QUALITY_REPORT: &str = "QUALITY_REPORT";
    /// Cleaning pass finished.
    pub const CLEANING_DONE: &str = "CLEANING_DONE";
    /// Streaming aggregate pass started.
    pub const STREAM_PASS1_START: &str = "STREAM_PASS1_START";
    /// Streaming aggregate pass finished.
    pub const STREAM_PASS1_DONE: &str = "STREAM_PASS1_DONE";
    /// Streaming draw pass started.
    pub const STREAM_PASS2_START: &str = "STREAM_PASS2_START";
    /// Streaming draw pass finished.
    pub const STREAM_PASS2_DONE: &str = "STREAM_PASS2_DONE";
    /// Sample selected.
    pub const SAMPLING_DONE: &str = "SAMPLING_DONE";
    /// Sample report written.
    pub const REPORT_WRITTEN: &str = "REPORT_WRITTEN";
    /// Run summary persisted.
    pub const RUN_SUMMARY: &str = "RUN_SUMMARY";
}

/// Constants used by report and run-summary writers.
pub mod report {
    /// File name of the exported sample.
    pub const SAMPLE_FILENAME: &str = "sample_selection_output.csv";
    /// Directory (under the output dir) holding run summaries.
    pub const RUNS_DIR: &str = "runs";
    /// Methodology label persisted with each run summary.
    pub const METHODOLOGY: &str = "Random Non-Statistical";
    /// Header row of the exported sample.
    pub const SAMPLE_HEADERS: [&str; 8] = [
        "selection_type",
        "row_index",
        "transaction_id",
        "amount",
        "effective_date",
        "document_type",
        "description",
        "balance_side",
    ];
}

/// Constants used by the command line front end.
pub mod cli {
    /// Program name used when parsing arguments.
    pub const BIN_NAME: &str = "audit-sample";
    /// Exit status for invalid sampling parameters or arguments.
    pub const EXIT_INVALID_PARAMETERS: u8 = 2;
    /// Exit status for an unreadable population source.
    pub const EXIT_UNREADABLE_SOURCE: u8 = 3;
    /// Exit status for an empty population after cleaning.
    pub const EXIT_EMPTY_POPULATION: u8 = 4;
    /// Exit status for any other failure.
    pub const EXIT_FAILURE: u8 = 1;
}
