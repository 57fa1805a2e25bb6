//! brute-force commitment value recovery
//!
//! rebuilds the value of a note whose preimage secrets are known but whose
//! amount was lost, by walking an integer-denominated candidate range and
//! comparing commitment hashes. the walk races a deadline.

use std::time::{Duration, Instant};

use alloy::primitives::U256;
use ark_bn254::Fr;
use thiserror::Error;

use crate::commitment::{Commitment, CommitmentError};

/// candidates are checked in batches of this size between deadline polls
const DEADLINE_POLL_INTERVAL: u64 = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoverError {
    #[error("invalid range: {0}")]
    InvalidRange(&'static str),
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

pub type Result<T> = std::result::Result<T, RecoverError>;

/// inclusive integer range walked in `step` increments
///
/// ranges are integer-denominated: callers scale display amounts by the
/// asset's decimals before building one. no rounding happens here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRange {
    pub min: U256,
    pub max: U256,
    pub step: U256,
}

impl ValueRange {
    pub fn new(min: U256, max: U256, step: U256) -> Result<Self> {
        if step.is_zero() {
            return Err(RecoverError::InvalidRange("step must be non-zero"));
        }
        if min > max {
            return Err(RecoverError::InvalidRange("min exceeds max"));
        }
        Ok(Self { min, max, step })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoverOutcome {
    Found { value: U256 },
    NotFound { cause: NotFoundCause },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotFoundCause {
    /// the whole range was enumerated without a match
    Exhausted,
    /// the deadline fired first
    Timeout,
}

/// enumerate `range` looking for the value whose commitment under
/// `(label, nullifier, secret)` hashes to `target`
pub fn recover_commitment_value(
    target: Fr,
    label: Fr,
    nullifier: Fr,
    secret: Fr,
    range: ValueRange,
    budget: Duration,
) -> Result<RecoverOutcome> {
    let deadline = Instant::now() + budget;
    let mut candidate = range.min;
    let mut since_poll = 0u64;

    loop {
        let commitment = Commitment::compute(candidate, label, nullifier, secret)?;
        if commitment.hash == target {
            return Ok(RecoverOutcome::Found { value: candidate });
        }

        since_poll += 1;
        if since_poll >= DEADLINE_POLL_INTERVAL {
            since_poll = 0;
            if Instant::now() >= deadline {
                return Ok(RecoverOutcome::NotFound {
                    cause: NotFoundCause::Timeout,
                });
            }
        }

        // inclusive upper bound, overflow-safe
        match candidate.checked_add(range.step) {
            Some(next) if next <= range.max => candidate = next,
            _ => {
                return Ok(RecoverOutcome::NotFound {
                    cause: NotFoundCause::Exhausted,
                })
            }
        }
    }
}
