use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use rust_decimal_macros::dec;
use tempfile::tempdir;

use audit_sampler::config::{BalanceType, SampleSizePolicy, SamplingParameters};
use audit_sampler::sampler::{NoProgress, ProgressEvent, sample_in_memory, sample_streaming};
use audit_sampler::source::{CsvFileSource, CsvReaderSource, OneShotCsvSource};
use audit_sampler::{QualityReport, SamplingError};

/// General-ledger style export: aliased headers, formatted amounts, and a
/// sprinkling of rows the cleaner must reject.
fn ledger_csv(rows: usize) -> String {
    let mut text = String::from("\u{feff}TransactionID,Value,Date,DocType,Memo\n");
    for row in 0..rows {
        let id = if row % 97 == 13 {
            String::new()
        } else {
            format!("JE-{row:05}")
        };
        let amount = match row % 50 {
            0 => format!("\"{},{:03}.00\"", 12 + row % 5, row % 1000),
            7 => "0".to_string(),
            11 => "n/a".to_string(),
            17 => format!("({}.25)", row % 300 + 1),
            23 => String::new(),
            _ => format!("{}.{:02}", row % 400 + 1, row % 100),
        };
        let date = if row % 31 == 0 { "31/31/2024" } else { "15/03/2024" };
        writeln!(text, "{id},{amount},{date},JE,entry {row}").unwrap();
    }
    text
}

fn write_ledger(dir: &Path, rows: usize) -> std::path::PathBuf {
    let path = dir.join("ledger.csv");
    fs::write(&path, ledger_csv(rows)).unwrap();
    path
}

fn amount_counters(quality: &QualityReport) -> [u64; 7] {
    [
        quality.total_rows_raw,
        quality.total_rows_cleaned,
        quality.missing_transaction_id,
        quality.missing_amount,
        quality.invalid_amount_format,
        quality.excluded_due_to_amount,
        quality.excluded_due_to_balance,
    ]
}

#[test]
fn streaming_matches_in_memory_population_and_high_value_members() {
    let temp = tempdir().unwrap();
    let path = write_ledger(temp.path(), 2_000);

    for balance_type in [BalanceType::Both, BalanceType::Debit, BalanceType::Credit] {
        let params = SamplingParameters::new(2_500.0, 250.0, 1.5)
            .with_balance_type(balance_type)
            .with_seed(7);
        let interval = params.validate().unwrap();

        let (exact, exact_quality) =
            sample_in_memory(&mut CsvFileSource::new(&path), &params).unwrap();
        let (streamed, stream_quality) =
            sample_streaming(&mut CsvFileSource::new(&path), &params, &mut NoProgress).unwrap();

        assert_eq!(
            streamed.statistics.population_size,
            exact.statistics.population_size
        );
        assert_eq!(
            streamed.statistics.population_balance_abs,
            exact.statistics.population_balance_abs
        );
        assert_eq!(
            streamed.statistics.sampling_interval,
            exact.statistics.sampling_interval
        );
        assert_eq!(
            streamed.statistics.random_sample_count,
            exact.statistics.random_sample_count
        );
        let exact_high: Vec<u64> = exact.high_value_items.iter().map(|t| t.row_index).collect();
        let stream_high: Vec<u64> = streamed
            .high_value_items
            .iter()
            .map(|t| t.row_index)
            .collect();
        assert_eq!(stream_high, exact_high, "{balance_type}");
        assert!(
            streamed
                .random_items
                .iter()
                .all(|txn| txn.amount_abs() <= interval)
        );
        assert_eq!(amount_counters(&stream_quality), amount_counters(&exact_quality));
        assert!(exact_quality.invalid_date_format > 0);
        assert_eq!(stream_quality.invalid_date_format, 0);
    }
}

#[test]
fn streaming_random_items_are_sorted_and_distinct() {
    let temp = tempdir().unwrap();
    let path = write_ledger(temp.path(), 3_000);
    let params = SamplingParameters::new(1_000.0, 0.0, 1.0)
        .with_sample_size(SampleSizePolicy::Fixed(40));
    let (result, _) =
        sample_streaming(&mut CsvFileSource::new(&path), &params, &mut NoProgress).unwrap();
    let rows: Vec<u64> = result.random_items.iter().map(|t| t.row_index).collect();
    assert_eq!(rows.len(), 40);
    assert!(rows.windows(2).all(|pair| pair[0] < pair[1]));
    let unique: HashSet<u64> = rows.iter().copied().collect();
    assert_eq!(unique.len(), rows.len());
}

#[test]
fn streaming_is_deterministic_for_seed() {
    let temp = tempdir().unwrap();
    let path = write_ledger(temp.path(), 1_500);
    let params = SamplingParameters::new(3_000.0, 0.0, 2.0).with_seed(99);
    let run = || {
        sample_streaming(&mut CsvFileSource::new(&path), &params, &mut NoProgress)
            .unwrap()
            .0
    };
    assert_eq!(run(), run());
}

#[test]
fn streaming_keeps_text_fields_untransformed() {
    let csv = "transaction_id,amount,description,document_type\n\
               T1,5000,  padded  ,none\n\
               T2,10,,INV\n";
    let mut source = CsvReaderSource::new(Cursor::new(csv.as_bytes().to_vec()));
    let params = SamplingParameters::new(100.0, 0.0, 1.0);
    let (result, _) = sample_streaming(&mut source, &params, &mut NoProgress).unwrap();
    let high = &result.high_value_items[0];
    assert_eq!(high.description.as_deref(), Some("  padded  "));
    assert_eq!(high.document_type.as_deref(), Some("none"));
    let random = &result.random_items[0];
    assert_eq!(random.description, None);
    assert_eq!(random.amount, dec!(10));
}

#[test]
fn streaming_rejects_sources_that_cannot_be_reread() {
    let params = SamplingParameters::new(100.0, 0.0, 1.0);
    let mut one_shot = OneShotCsvSource::new("transaction_id,amount\nT1,10\n".as_bytes());
    let err = sample_streaming(&mut one_shot, &params, &mut NoProgress).unwrap_err();
    assert!(matches!(err, SamplingError::UnreadableSource { .. }));

    let temp = tempdir().unwrap();
    let mut missing = CsvFileSource::new(temp.path().join("absent.csv"));
    let err = sample_streaming(&mut missing, &params, &mut NoProgress).unwrap_err();
    assert!(matches!(err, SamplingError::UnreadableSource { .. }));
}

#[test]
fn one_shot_source_still_supports_in_memory_sampling() {
    let params = SamplingParameters::new(100.0, 0.0, 1.0);
    let mut source = OneShotCsvSource::new("transaction_id,amount\nT1,500\nT2,10\n".as_bytes());
    let (result, quality) = sample_in_memory(&mut source, &params).unwrap();
    assert_eq!(quality.total_rows_cleaned, 2);
    assert_eq!(result.high_value_items.len(), 1);
}

#[test]
fn header_only_file_is_an_empty_population_in_both_modes() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("empty.csv");
    fs::write(&path, "transaction_id,amount,effective_date\n").unwrap();
    let params = SamplingParameters::new(100.0, 0.0, 1.0);

    let err = sample_in_memory(&mut CsvFileSource::new(&path), &params).unwrap_err();
    assert!(matches!(err, SamplingError::EmptyPopulation { .. }));
    assert_eq!(err.quality_report().unwrap().total_rows_raw, 0);

    let mut passes = Vec::new();
    let err = sample_streaming(
        &mut CsvFileSource::new(&path),
        &params,
        &mut |event: ProgressEvent| passes.push(event.pass),
    )
    .unwrap_err();
    assert!(matches!(err, SamplingError::EmptyPopulation { .. }));
    assert_eq!(passes.len(), 1);
}

#[test]
fn file_without_amount_column_is_unreadable() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("no_amount.csv");
    fs::write(&path, "transaction_id,description\nT1,rent\n").unwrap();
    let params = SamplingParameters::new(100.0, 0.0, 1.0);
    let err = sample_in_memory(&mut CsvFileSource::new(&path), &params).unwrap_err();
    assert!(matches!(err, SamplingError::UnreadableSource { .. }));
}
