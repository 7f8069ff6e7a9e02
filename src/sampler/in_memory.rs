use rand::Rng;
use tracing::info;

use crate::cleaner::clean_source;
use crate::config::SamplingParameters;
use crate::constants::events::SAMPLING_DONE;
use crate::data::{CleanedTransaction, QualityReport, SampleResult};
use crate::errors::SamplingError;
use crate::metrics::{build_statistics, sum_abs};
use crate::sampler::{DeterministicRng, partition, resolve_sample_size};
use crate::source::PopulationSource;

/// Clean every row of `source`, then sample the materialized population.
///
/// Parameters are validated before the first row is read. An empty cleaned
/// population fails with [`SamplingError::EmptyPopulation`] carrying the
/// quality report.
pub fn sample_in_memory(
    source: &mut dyn PopulationSource,
    params: &SamplingParameters,
) -> Result<(SampleResult, QualityReport), SamplingError> {
    params.validate()?;
    let (population, quality) = clean_source(source, params)?;
    if population.is_empty() {
        return Err(SamplingError::EmptyPopulation {
            quality: Box::new(quality),
        });
    }
    let result = sample_population(population, params)?;
    Ok((result, quality))
}

/// Sample an already-cleaned population.
///
/// High-value items are kept in input order. The remainder is drawn by a
/// partial Fisher-Yates shuffle of its positions, seeded from `params.seed`;
/// the picks are returned in input order. The outcome depends only on the
/// ordered remainder and the seed.
pub fn sample_population(
    population: Vec<CleanedTransaction>,
    params: &SamplingParameters,
) -> Result<SampleResult, SamplingError> {
    let interval = params.validate()?;
    if population.is_empty() {
        return Err(SamplingError::EmptyPopulation {
            quality: Box::default(),
        });
    }
    let population_size = population.len() as u64;
    let population_balance_abs = sum_abs(&population);

    let (high_value_items, remainder) = partition(population, interval);
    let target = resolve_sample_size(
        params.sample_size,
        remainder.len(),
        sum_abs(&remainder),
        interval,
    );
    let mut rng = DeterministicRng::new(params.seed);
    let mut chosen = vec![false; remainder.len()];
    for position in draw_positions(&mut rng, remainder.len(), target) {
        chosen[position] = true;
    }
    let random_items: Vec<CleanedTransaction> = remainder
        .into_iter()
        .zip(chosen)
        .filter_map(|(txn, keep)| keep.then_some(txn))
        .collect();

    let statistics = build_statistics(
        &high_value_items,
        &random_items,
        population_size,
        population_balance_abs,
        interval,
    );
    info!(
        event = SAMPLING_DONE,
        mode = "in_memory",
        population_size,
        high_value_count = statistics.high_value_count,
        random_sample_count = statistics.random_sample_count,
        coverage_percent = statistics.coverage_percent,
        "sampling finished"
    );
    Ok(SampleResult {
        high_value_items,
        random_items,
        statistics,
    })
}

/// Choose `count` distinct positions out of `0..len` uniformly.
fn draw_positions<R: Rng>(rng: &mut R, len: usize, count: usize) -> Vec<usize> {
    let count = count.min(len);
    let mut positions: Vec<usize> = (0..len).collect();
    for idx in 0..count {
        let swap_with = rng.random_range(idx..len);
        positions.swap(idx, swap_with);
    }
    positions.truncate(count);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SampleSizePolicy;
    use crate::data::{BalanceSide, RawRecord};
    use crate::source::InMemorySource;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    fn txn(row: u64, amount: Decimal) -> CleanedTransaction {
        CleanedTransaction {
            transaction_id: format!("T{row}"),
            amount,
            effective_date: None,
            document_type: None,
            description: None,
            balance_side: BalanceSide::from_amount(amount),
            row_index: row,
        }
    }

    fn ladder(len: u64) -> Vec<CleanedTransaction> {
        (0..len).map(|row| txn(row, Decimal::from(row + 1))).collect()
    }

    #[test]
    fn draw_positions_are_distinct_and_bounded() {
        let mut rng = DeterministicRng::new(9);
        let picks = draw_positions(&mut rng, 50, 20);
        assert_eq!(picks.len(), 20);
        let unique: HashSet<usize> = picks.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert!(picks.iter().all(|pick| *pick < 50));
        assert_eq!(draw_positions(&mut rng, 3, 10).len(), 3);
        assert!(draw_positions(&mut rng, 0, 0).is_empty());
    }

    #[test]
    fn interval_scenario_splits_strata() {
        let params = SamplingParameters::new(1000.0, 100.0, 2.0);
        let result = sample_population(vec![txn(0, dec!(500)), txn(1, dec!(100))], &params).unwrap();
        assert_eq!(result.statistics.sampling_interval, dec!(450));
        assert_eq!(result.high_value_items.len(), 1);
        assert_eq!(result.high_value_items[0].amount, dec!(500));
        assert_eq!(result.random_items.len(), 1);
        assert_eq!(result.random_items[0].amount, dec!(100));
        assert_eq!(result.statistics.coverage_abs, dec!(600));
        assert_eq!(result.statistics.coverage_percent, 100.0);
    }

    #[test]
    fn same_seed_same_sample() {
        let params = SamplingParameters::new(50.0, 0.0, 1.0)
            .with_sample_size(SampleSizePolicy::Fixed(7))
            .with_seed(1234);
        let first = sample_population(ladder(40), &params).unwrap();
        let second = sample_population(ladder(40), &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.random_items.len(), 7);

        let other = sample_population(ladder(40), &params.clone().with_seed(99)).unwrap();
        assert_eq!(other.random_items.len(), 7);
    }

    #[test]
    fn random_items_come_back_in_population_order() {
        let params = SamplingParameters::new(1000.0, 0.0, 1.0)
            .with_sample_size(SampleSizePolicy::Proportion(0.5));
        let result = sample_population(ladder(30), &params).unwrap();
        let rows: Vec<u64> = result.random_items.iter().map(|t| t.row_index).collect();
        let mut sorted = rows.clone();
        sorted.sort_unstable();
        assert_eq!(rows, sorted);
        assert_eq!(rows.len(), 15);
    }

    #[test]
    fn empty_population_is_fatal() {
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let err = sample_population(Vec::new(), &params).unwrap_err();
        assert!(matches!(err, SamplingError::EmptyPopulation { .. }));
    }

    #[test]
    fn sample_in_memory_reports_quality_on_empty_population() {
        let mut source = InMemorySource::new(vec![
            RawRecord::new(0, "T1", "0"),
            RawRecord::new(1, "T2", "bad"),
        ]);
        let params = SamplingParameters::new(100.0, 0.0, 1.0);
        let err = sample_in_memory(&mut source, &params).unwrap_err();
        let quality = err.quality_report().unwrap();
        assert_eq!(quality.total_rows_raw, 2);
        assert_eq!(quality.excluded_due_to_amount, 1);
        assert_eq!(quality.invalid_amount_format, 1);
    }

    #[test]
    fn invalid_parameters_fail_before_reading() {
        let mut source = InMemorySource::new(vec![RawRecord::new(0, "T1", "10")]);
        let params = SamplingParameters::new(100.0, 100.0, 1.0);
        let err = sample_in_memory(&mut source, &params).unwrap_err();
        assert!(matches!(err, SamplingError::InvalidParameters { .. }));
    }
}
