//! Sampling strategies and their shared building blocks.
//!
//! Both strategies split the population at the sampling interval: items whose
//! absolute amount exceeds it are taken in full, and a seeded random subset of
//! the remainder is drawn. [`sample_population`] works on a materialized
//! population; [`sample_streaming`] reads the source twice and keeps only the
//! sample in memory.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::SampleSizePolicy;
use crate::data::CleanedTransaction;

/// Exact sampling over a materialized population.
pub mod in_memory;
/// Two-pass reservoir sampling over a re-readable source.
pub mod streaming;

pub use in_memory::{sample_in_memory, sample_population};
pub use streaming::sample_streaming;

#[derive(Debug, Clone)]
/// Small deterministic RNG (SplitMix64) so a seed reproduces the same draw.
pub(crate) struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// True when an absolute amount belongs to the high-value stratum.
///
/// Items exactly at the interval stay in the remainder.
pub fn is_high_value(amount_abs: Decimal, interval: Decimal) -> bool {
    amount_abs > interval
}

/// Split a population into (high value, remainder), both in input order.
pub fn partition(
    population: Vec<CleanedTransaction>,
    interval: Decimal,
) -> (Vec<CleanedTransaction>, Vec<CleanedTransaction>) {
    population
        .into_iter()
        .partition(|txn| is_high_value(txn.amount_abs(), interval))
}

/// Number of remainder items the random draw selects.
///
/// Every policy is capped at `remainder_len`.
pub fn resolve_sample_size(
    policy: SampleSizePolicy,
    remainder_len: usize,
    remainder_balance_abs: Decimal,
    interval: Decimal,
) -> usize {
    let target = match policy {
        SampleSizePolicy::BalanceOverInterval => {
            if remainder_balance_abs.is_zero() || interval <= Decimal::ZERO {
                0
            } else {
                remainder_balance_abs
                    .checked_div(interval)
                    .and_then(|ratio| ratio.ceil().to_usize())
                    .unwrap_or(remainder_len)
            }
        }
        SampleSizePolicy::Fixed(count) => count,
        SampleSizePolicy::Proportion(share) => {
            let scaled = (share * remainder_len as f64).ceil();
            if scaled.is_finite() && scaled > 0.0 {
                scaled as usize
            } else {
                0
            }
        }
    };
    target.min(remainder_len)
}

/// Which read of a streaming run a progress event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPass {
    /// Pass 1: population aggregates.
    Aggregate,
    /// Pass 2: high-value collection and reservoir draw.
    Draw,
}

/// Rows read so far in one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Pass being read.
    pub pass: StreamPass,
    /// Rows read so far in this pass, rejected rows included.
    pub rows_read: u64,
    /// Set on the final event of a pass.
    pub finished: bool,
}

/// Receives informational progress while a source is being read.
pub trait ProgressSink {
    /// Called every few thousand rows and once at the end of each pass.
    fn on_progress(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn on_progress(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _event: ProgressEvent) {}
}
