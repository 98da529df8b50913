//! Provably fair dice
//!
//! Implements seeded, verifiable dice rolling:
//! - Expression parsing (e.g., "2d6+3")
//! - Root seed generation and labelled seed derivation
//! - Unbiased per-die sampling via SHA-256 and rejection sampling
//! - Advantage/disadvantage rolls built from derived seeds
//! - Verification of a published roll from expression + seed

mod engine;
mod expression;
mod sampler;
mod seed;
mod verify;

use thiserror::Error;

pub use engine::{DiceService, RollMode, RollResult};
pub use expression::{
    parse_dice, DiceRoll, ExpressionError, MAX_DICE, MAX_MODIFIER, MAX_SIDES, MIN_DICE, MIN_SIDES,
};
pub use sampler::{sample_die, DrawSource, Sha256Draw, MAX_ATTEMPTS};
pub use seed::{derive_seed, generate_seed, EntropySource, Seed, SystemEntropy, SEED_BYTES};
pub use verify::VerificationOutcome;

/// Errors that can occur while producing a roll
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("invalid dice expression: {0}")]
    Expression(#[from] ExpressionError),

    /// The draw backend kept producing out-of-range values. This points at a
    /// broken hash backend, never at bad input.
    #[error("failed to sample a fair d{sides} for die {die_index} after {attempts} attempts")]
    SamplingExhausted {
        die_index: u32,
        sides: u32,
        attempts: u32,
    },
}
