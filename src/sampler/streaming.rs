use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::cleaner::Cleaner;
use crate::config::SamplingParameters;
use crate::constants::events::{
    SAMPLING_DONE, STREAM_PASS1_DONE, STREAM_PASS1_START, STREAM_PASS2_DONE, STREAM_PASS2_START,
};
use crate::constants::sampler::PROGRESS_BATCH_ROWS;
use crate::data::{CleanedTransaction, QualityReport, RawRecord, SampleResult};
use crate::errors::SamplingError;
use crate::metrics::build_statistics;
use crate::sampler::{
    DeterministicRng, ProgressEvent, ProgressSink, StreamPass, is_high_value, resolve_sample_size,
};
use crate::source::PopulationSource;

/// Aggregates observed over one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PassTotals {
    population_size: u64,
    population_balance_abs: Decimal,
    high_value_count: u64,
    high_value_abs: Decimal,
}

impl PassTotals {
    fn observe(&mut self, amount_abs: Decimal, interval: Decimal) -> bool {
        self.population_size += 1;
        self.population_balance_abs = self.population_balance_abs.saturating_add(amount_abs);
        let high_value = is_high_value(amount_abs, interval);
        if high_value {
            self.high_value_count += 1;
            self.high_value_abs = self.high_value_abs.saturating_add(amount_abs);
        }
        high_value
    }

    fn remainder_len(&self) -> usize {
        (self.population_size - self.high_value_count) as usize
    }

    fn remainder_abs(&self) -> Decimal {
        self.population_balance_abs - self.high_value_abs
    }
}

/// Fixed-capacity uniform sample over a stream (Algorithm R).
#[derive(Debug)]
struct Reservoir {
    capacity: usize,
    seen: u64,
    items: Vec<CleanedTransaction>,
}

impl Reservoir {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: 0,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Offer the next eligible row; `materialize` runs only if it is kept.
    fn offer<R: Rng>(
        &mut self,
        rng: &mut R,
        materialize: impl FnOnce() -> CleanedTransaction,
    ) {
        self.seen += 1;
        if self.capacity == 0 {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(materialize());
            return;
        }
        let slot = rng.random_range(0..self.seen);
        if slot < self.capacity as u64 {
            self.items[slot as usize] = materialize();
        }
    }

    fn into_sorted(mut self) -> Vec<CleanedTransaction> {
        self.items.sort_by_key(|txn| txn.row_index);
        self.items
    }
}

/// Sample a re-readable source in two sequential passes.
///
/// Pass 1 screens every row with the fast-mode rules and accumulates the
/// population aggregates and quality report. Pass 2 re-reads the source,
/// keeps every high-value row and draws the remainder through a reservoir
/// seeded from `params.seed`. Only the sample is held in memory.
///
/// Fails with [`SamplingError::UnreadableSource`] when the source cannot be
/// read twice or when pass 2 observes different aggregates than pass 1.
pub fn sample_streaming(
    source: &mut dyn PopulationSource,
    params: &SamplingParameters,
    progress: &mut dyn ProgressSink,
) -> Result<(SampleResult, QualityReport), SamplingError> {
    let interval = params.validate()?;
    if !source.can_reopen() {
        return Err(SamplingError::unreadable(
            source.id(),
            "streaming mode requires a source that can be read twice",
        ));
    }
    let source_id = source.id().to_string();

    info!(event = STREAM_PASS1_START, source = %source_id, "aggregating population");
    let mut cleaner = Cleaner::new(params);
    let mut totals = PassTotals::default();
    let rows_read = scan(source, StreamPass::Aggregate, progress, |raw| {
        if let Ok(screened) = cleaner.screen(raw) {
            totals.observe(screened.amount.abs(), interval);
        }
    })?;
    let quality = cleaner.finish();
    info!(
        event = STREAM_PASS1_DONE,
        rows_read,
        population_size = totals.population_size,
        population_balance_abs = %totals.population_balance_abs,
        high_value_count = totals.high_value_count,
        "population aggregated"
    );
    if totals.population_size == 0 {
        return Err(SamplingError::EmptyPopulation {
            quality: Box::new(quality),
        });
    }

    let capacity = resolve_sample_size(
        params.sample_size,
        totals.remainder_len(),
        totals.remainder_abs(),
        interval,
    );
    info!(
        event = STREAM_PASS2_START,
        source = %source_id,
        reservoir_capacity = capacity,
        "drawing sample"
    );
    let mut cleaner = Cleaner::new(params);
    let mut rng = DeterministicRng::new(params.seed);
    let mut reservoir = Reservoir::new(capacity);
    let mut high_value_items = Vec::new();
    let mut observed = PassTotals::default();
    scan(source, StreamPass::Draw, progress, |raw| {
        let Ok(screened) = cleaner.screen(raw) else {
            return;
        };
        if observed.observe(screened.amount.abs(), interval) {
            high_value_items.push(Cleaner::materialize(raw, screened));
        } else {
            reservoir.offer(&mut rng, || Cleaner::materialize(raw, screened));
        }
    })?;
    if observed != totals {
        debug!(?totals, ?observed, "pass aggregates differ");
        return Err(SamplingError::unreadable(
            source_id,
            "population changed between passes",
        ));
    }
    let random_items = reservoir.into_sorted();
    info!(
        event = STREAM_PASS2_DONE,
        high_value_count = high_value_items.len(),
        random_sample_count = random_items.len(),
        "sample drawn"
    );

    let statistics = build_statistics(
        &high_value_items,
        &random_items,
        totals.population_size,
        totals.population_balance_abs,
        interval,
    );
    info!(
        event = SAMPLING_DONE,
        mode = "streaming",
        population_size = statistics.population_size,
        high_value_count = statistics.high_value_count,
        random_sample_count = statistics.random_sample_count,
        coverage_percent = statistics.coverage_percent,
        "sampling finished"
    );
    Ok((
        SampleResult {
            high_value_items,
            random_items,
            statistics,
        },
        quality,
    ))
}

/// Read every row of one pass, reporting progress in batches.
fn scan(
    source: &mut dyn PopulationSource,
    pass: StreamPass,
    progress: &mut dyn ProgressSink,
    mut visit: impl FnMut(&RawRecord),
) -> Result<u64, SamplingError> {
    let mut rows_read = 0u64;
    for record in source.records()? {
        let record = record?;
        visit(&record);
        rows_read += 1;
        if rows_read % PROGRESS_BATCH_ROWS == 0 {
            progress.on_progress(ProgressEvent {
                pass,
                rows_read,
                finished: false,
            });
        }
    }
    progress.on_progress(ProgressEvent {
        pass,
        rows_read,
        finished: true,
    });
    Ok(rows_read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleSizePolicy;
    use crate::sampler::{NoProgress, sample_in_memory};
    use crate::source::{InMemorySource, OneShotCsvSource, RecordIter};
    use rust_decimal_macros::dec;

    fn population(len: u64) -> InMemorySource {
        InMemorySource::new(
            (0..len)
                .map(|row| {
                    let amount = if row % 10 == 0 { 1_000 + row } else { row + 1 };
                    RawRecord::new(row, &format!("T{row}"), &amount.to_string())
                })
                .collect(),
        )
    }

    #[test]
    fn reservoir_keeps_first_items_until_full() {
        let mut rng = DeterministicRng::new(1);
        let mut reservoir = Reservoir::new(3);
        for row in 0..3u64 {
            reservoir.offer(&mut rng, || CleanedTransaction {
                transaction_id: format!("T{row}"),
                amount: Decimal::ONE,
                effective_date: None,
                document_type: None,
                description: None,
                balance_side: crate::data::BalanceSide::Debit,
                row_index: row,
            });
        }
        let rows: Vec<u64> = reservoir.into_sorted().iter().map(|t| t.row_index).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn zero_capacity_reservoir_never_materializes() {
        let mut rng = DeterministicRng::new(1);
        let mut reservoir = Reservoir::new(0);
        reservoir.offer(&mut rng, || panic!("materialized"));
        assert_eq!(reservoir.seen, 1);
        assert!(reservoir.into_sorted().is_empty());
    }

    #[test]
    fn matches_in_memory_aggregates_and_high_value_members() {
        let params = SamplingParameters::new(500.0, 0.0, 1.0)
            .with_sample_size(SampleSizePolicy::Fixed(12));
        let (streamed, stream_quality) =
            sample_streaming(&mut population(200), &params, &mut NoProgress).unwrap();
        let (exact, exact_quality) = sample_in_memory(&mut population(200), &params).unwrap();

        assert_eq!(
            streamed.statistics.population_size,
            exact.statistics.population_size
        );
        assert_eq!(
            streamed.statistics.population_balance_abs,
            exact.statistics.population_balance_abs
        );
        assert_eq!(streamed.high_value_items, exact.high_value_items);
        assert_eq!(streamed.random_items.len(), 12);
        assert_eq!(stream_quality.total_rows_cleaned, exact_quality.total_rows_cleaned);
        assert_eq!(streamed.statistics.sampling_interval, dec!(500));
    }

    #[test]
    fn one_shot_source_is_rejected_before_reading() {
        let mut source = OneShotCsvSource::new("transaction_id,amount\nT1,10\n".as_bytes());
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let err = sample_streaming(&mut source, &params, &mut NoProgress).unwrap_err();
        assert!(matches!(err, SamplingError::UnreadableSource { .. }));
        assert!(source.records().is_ok());
    }

    #[test]
    fn empty_population_stops_after_first_pass() {
        let mut source = InMemorySource::new(vec![RawRecord::new(0, "T1", "0")]);
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let mut events = Vec::new();
        let err = sample_streaming(&mut source, &params, &mut |event: ProgressEvent| {
            events.push(event)
        })
        .unwrap_err();
        assert_eq!(err.quality_report().unwrap().excluded_due_to_amount, 1);
        assert!(events.iter().all(|event| event.pass == StreamPass::Aggregate));
    }

    /// Source whose second read returns a different population.
    struct ShiftingSource {
        reads: u32,
    }

    impl PopulationSource for ShiftingSource {
        fn id(&self) -> &str {
            "shifting"
        }

        fn can_reopen(&self) -> bool {
            true
        }

        fn records(&mut self) -> Result<RecordIter<'_>, SamplingError> {
            self.reads += 1;
            let rows = if self.reads == 1 { 3 } else { 4 };
            Ok(Box::new((0..rows).map(|row| {
                Ok::<_, SamplingError>(RawRecord::new(row, &format!("T{row}"), "10"))
            })))
        }
    }

    #[test]
    fn changed_source_between_passes_is_unreadable() {
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let err = sample_streaming(&mut ShiftingSource { reads: 0 }, &params, &mut NoProgress)
            .unwrap_err();
        assert!(err.to_string().contains("changed between passes"));
    }

    #[test]
    fn progress_reports_batches_and_pass_ends() {
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let mut events = Vec::new();
        let mut sink = |event: ProgressEvent| events.push(event);
        sample_streaming(&mut population(25_000), &params, &mut sink).unwrap();
        let first: Vec<u64> = events
            .iter()
            .filter(|event| event.pass == StreamPass::Aggregate)
            .map(|event| event.rows_read)
            .collect();
        assert_eq!(first, vec![10_000, 20_000, 25_000]);
        assert_eq!(events.iter().filter(|event| event.finished).count(), 2);
    }
}
