//! Materiality interval derivation.
//!
//! The interval separates the high-value stratum from the remainder. It is
//! derived from parameters alone and never from observed data.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::config::SamplingParameters;
use crate::errors::SamplingError;

/// Compute the sampling interval for `params`.
///
/// Uses `high_value_override` when it is present and positive, otherwise
/// `(tolerable - expected) / assurance`.
///
/// The interval is stored as a [`Decimal`], so a value above `Decimal::MAX`
/// (about 7.9e28) or one that rounds to zero at 28 decimal places is also
/// rejected with [`SamplingError::InvalidParameters`], even though it is
/// positive.
pub fn sampling_interval(params: &SamplingParameters) -> Result<Decimal, SamplingError> {
    if params.assurance <= 0.0 {
        return Err(SamplingError::invalid(
            "assurance",
            format!("must be greater than zero, got {}", params.assurance),
        ));
    }
    if params.expected >= params.tolerable {
        return Err(SamplingError::invalid(
            "expected",
            format!(
                "must be less than tolerable ({} >= {})",
                params.expected, params.tolerable
            ),
        ));
    }
    let (parameter, raw) = match params.high_value_override {
        Some(threshold) if threshold > 0.0 => ("high_value_override", threshold),
        _ => (
            "assurance",
            (params.tolerable - params.expected) / params.assurance,
        ),
    };
    if !(raw.is_finite() && raw > 0.0) {
        return Err(SamplingError::invalid(
            parameter,
            format!("sampling interval must be positive, got {raw}"),
        ));
    }
    let interval = Decimal::from_f64(raw).ok_or_else(|| {
        SamplingError::invalid(
            parameter,
            format!("sampling interval {raw} is outside the decimal range"),
        )
    })?;
    if interval <= Decimal::ZERO {
        return Err(SamplingError::invalid(
            parameter,
            format!("sampling interval rounds to {interval}"),
        ));
    }
    Ok(interval)
}
