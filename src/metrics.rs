use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::data::{CleanedTransaction, SampleStatistics};

/// Sum of absolute amounts, saturating at the decimal range.
pub fn sum_abs<'a>(items: impl IntoIterator<Item = &'a CleanedTransaction>) -> Decimal {
    items
        .into_iter()
        .fold(Decimal::ZERO, |acc, txn| acc.saturating_add(txn.amount_abs()))
}

/// Compute sample statistics from the chosen items and population aggregates.
///
/// `coverage_abs` is the absolute value covered by both strata;
/// `coverage_percent` is 0 when the population balance is 0.
pub fn build_statistics(
    high_value: &[CleanedTransaction],
    random: &[CleanedTransaction],
    population_size: u64,
    population_balance_abs: Decimal,
    sampling_interval: Decimal,
) -> SampleStatistics {
    let coverage_abs = sum_abs(high_value).saturating_add(sum_abs(random));
    SampleStatistics {
        population_size,
        population_balance_abs,
        sampling_interval,
        high_value_count: high_value.len() as u64,
        random_sample_count: random.len() as u64,
        coverage_abs,
        coverage_percent: coverage_percent(coverage_abs, population_balance_abs),
    }
}

fn coverage_percent(coverage_abs: Decimal, population_balance_abs: Decimal) -> f64 {
    if population_balance_abs.is_zero() {
        return 0.0;
    }
    let ratio = coverage_abs
        .checked_div(population_balance_abs)
        .and_then(|ratio| ratio.to_f64())
        .unwrap_or(0.0);
    ratio * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BalanceSide;
    use rust_decimal_macros::dec;

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

    #[test]
    fn coverage_uses_absolute_amounts() {
        let high = vec![txn(0, dec!(-500))];
        let random = vec![txn(1, dec!(100))];
        let stats = build_statistics(&high, &random, 4, dec!(1000), dec!(450));
        assert_eq!(stats.coverage_abs, dec!(600));
        assert_eq!(stats.high_value_count, 1);
        assert_eq!(stats.random_sample_count, 1);
        assert!((stats.coverage_percent - 60.0).abs() < 1e-9);
        assert_eq!(stats.sampling_interval, dec!(450));
    }

    #[test]
    fn zero_balance_yields_zero_coverage() {
        let stats = build_statistics(&[], &[txn(0, Decimal::ZERO)], 1, Decimal::ZERO, dec!(10));
        assert_eq!(stats.coverage_percent, 0.0);
        assert_eq!(stats.coverage_abs, Decimal::ZERO);
    }

    #[test]
    fn full_coverage_is_exactly_one_hundred() {
        let items = vec![txn(0, dec!(1)), txn(1, dec!(2)), txn(2, dec!(-3))];
        let total = sum_abs(&items);
        assert_eq!(total, dec!(6));
        let stats = build_statistics(&items, &[], 3, total, dec!(0.5));
        assert_eq!(stats.coverage_percent, 100.0);
    }
}
