use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::sampler::DEFAULT_SEED;
use crate::errors::SamplingError;

/// Which balance side is admitted into the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    /// Only debit (positive) rows.
    Debit,
    /// Only credit (negative) rows.
    Credit,
    /// Every side, zero amounts included when `include_zeros` is set.
    #[default]
    Both,
}

impl fmt::Display for BalanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debit => f.write_str("debit"),
            Self::Credit => f.write_str("credit"),
            Self::Both => f.write_str("both"),
        }
    }
}

/// How many remainder items the random draw selects.
///
/// Every policy is capped at the remainder size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SampleSizePolicy {
    /// `ceil(remainder_balance_abs / interval)`.
    #[default]
    BalanceOverInterval,
    /// A fixed item count.
    Fixed(usize),
    /// A share of the remainder item count, in `(0, 1]`, rounded up.
    Proportion(f64),
}

/// Audit parameters for one sampling run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingParameters {
    /// Tolerable misstatement. Must be positive.
    pub tolerable: f64,
    /// Expected misstatement. Must be non-negative and below `tolerable`.
    pub expected: f64,
    /// Assurance factor dividing the misstatement span. Must be positive.
    pub assurance: f64,
    /// Balance side filter.
    pub balance_type: BalanceType,
    /// Explicit high-value threshold; used instead of the derived interval when positive.
    pub high_value_override: Option<f64>,
    /// RNG seed that controls deterministic random selection.
    pub seed: u64,
    /// Keep zero-amount rows in the population.
    pub include_zeros: bool,
    /// Random sample size policy for the remainder stratum.
    pub sample_size: SampleSizePolicy,
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            tolerable: 1.0,
            expected: 0.0,
            assurance: 1.0,
            balance_type: BalanceType::Both,
            high_value_override: None,
            seed: DEFAULT_SEED,
            include_zeros: false,
            sample_size: SampleSizePolicy::BalanceOverInterval,
        }
    }
}

impl SamplingParameters {
    /// Create parameters from the three methodology inputs; everything else is defaulted.
    pub fn new(tolerable: f64, expected: f64, assurance: f64) -> Self {
        Self {
            tolerable,
            expected,
            assurance,
            ..Self::default()
        }
    }

    /// Override the balance side filter.
    pub fn with_balance_type(mut self, balance_type: BalanceType) -> Self {
        self.balance_type = balance_type;
        self
    }

    /// Set an explicit high-value threshold.
    pub fn with_high_value_override(mut self, threshold: f64) -> Self {
        self.high_value_override = Some(threshold);
        self
    }

    /// Override the deterministic seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep or drop zero-amount rows.
    pub fn with_include_zeros(mut self, include_zeros: bool) -> Self {
        self.include_zeros = include_zeros;
        self
    }

    /// Override the random sample size policy.
    pub fn with_sample_size(mut self, sample_size: SampleSizePolicy) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Validate parameter ranges and relationships, returning the sampling interval.
    ///
    /// This is the single pre-flight check; no row is read before it passes.
    pub fn validate(&self) -> Result<Decimal, SamplingError> {
        require_finite("tolerable", self.tolerable)?;
        require_finite("expected", self.expected)?;
        require_finite("assurance", self.assurance)?;
        if let Some(threshold) = self.high_value_override {
            require_finite("high_value_override", threshold)?;
        }
        if self.tolerable <= 0.0 {
            return Err(SamplingError::invalid(
                "tolerable",
                format!("must be greater than zero, got {}", self.tolerable),
            ));
        }
        if self.expected < 0.0 {
            return Err(SamplingError::invalid(
                "expected",
                format!("must not be negative, got {}", self.expected),
            ));
        }
        match self.sample_size {
            SampleSizePolicy::Proportion(share) if !(share > 0.0 && share <= 1.0) => {
                return Err(SamplingError::invalid(
                    "sample_size",
                    format!("proportion must be within (0, 1], got {share}"),
                ));
            }
            _ => {}
        }
        crate::interval::sampling_interval(self)
    }
}

fn require_finite(parameter: &'static str, value: f64) -> Result<(), SamplingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SamplingError::invalid(
            parameter,
            format!("must be a finite number, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_methodology() {
        let params = SamplingParameters::default();
        assert_eq!(params.seed, 42);
        assert_eq!(params.balance_type, BalanceType::Both);
        assert!(!params.include_zeros);
        assert_eq!(params.sample_size, SampleSizePolicy::BalanceOverInterval);
        assert!(params.high_value_override.is_none());
    }

    #[test]
    fn validate_rejects_non_finite_and_out_of_range_inputs() {
        let err = SamplingParameters::new(f64::NAN, 0.0, 1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SamplingError::InvalidParameters {
                parameter: "tolerable",
                ..
            }
        ));

        let err = SamplingParameters::new(100.0, -1.0, 1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            SamplingError::InvalidParameters {
                parameter: "expected",
                ..
            }
        ));

        let err = SamplingParameters::new(0.0, 0.0, 1.0).validate().unwrap_err();
        assert!(matches!(
            err,
            SamplingError::InvalidParameters {
                parameter: "tolerable",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_proportion_outside_unit_interval() {
        for share in [0.0, -0.5, 1.5] {
            let err = SamplingParameters::new(100.0, 0.0, 1.0)
                .with_sample_size(SampleSizePolicy::Proportion(share))
                .validate()
                .unwrap_err();
            assert!(matches!(
                err,
                SamplingError::InvalidParameters {
                    parameter: "sample_size",
                    ..
                }
            ));
        }
        let interval = SamplingParameters::new(100.0, 0.0, 1.0)
            .with_sample_size(SampleSizePolicy::Proportion(1.0))
            .validate()
            .unwrap();
        assert_eq!(interval, dec!(100));
    }

    #[test]
    fn balance_type_serializes_lowercase() {
        let json = serde_json::to_string(&BalanceType::Credit).unwrap();
        assert_eq!(json, "\"credit\"");
        assert_eq!(BalanceType::Debit.to_string(), "debit");
    }
}
