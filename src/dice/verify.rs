//! Roll verification
//!
//! Recomputes a roll from expression + seed and compares it with a claimed
//! breakdown. A failed check is an ordinary outcome, never an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::{DiceService, RollMode, RollResult};
use super::expression::parse_dice;
use super::seed::Seed;

/// Result of checking a claimed roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    /// Why the roll failed verification; absent when `valid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationOutcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

impl DiceService {
    /// Check that `breakdown` is exactly what `expr` rolls with `seed`
    pub fn verify(&self, expr: &str, seed: &Seed, breakdown: &[u32]) -> bool {
        self.verify_detailed(expr, seed, breakdown).valid
    }

    /// Like [`DiceService::verify`], reporting why a roll was rejected
    pub fn verify_detailed(
        &self,
        expr: &str,
        seed: &Seed,
        breakdown: &[u32],
    ) -> VerificationOutcome {
        self.verify_with_mode(RollMode::Normal, expr, seed, breakdown)
    }

    /// Verify a breakdown produced in `mode`. For paired modes `seed` is the
    /// root seed and `breakdown` holds both sub-rolls back to back.
    pub fn verify_with_mode(
        &self,
        mode: RollMode,
        expr: &str,
        seed: &Seed,
        breakdown: &[u32],
    ) -> VerificationOutcome {
        let outcome = self.check(mode, expr, seed, breakdown, None);
        log_outcome(mode, expr, seed, &outcome);
        outcome
    }

    /// Verify a complete roll result, including its claimed total
    pub fn verify_result(
        &self,
        mode: RollMode,
        expr: &str,
        claim: &RollResult,
    ) -> VerificationOutcome {
        let outcome = self.check(mode, expr, &claim.seed, &claim.breakdown, Some(claim.total));
        log_outcome(mode, expr, &claim.seed, &outcome);
        outcome
    }

    fn check(
        &self,
        mode: RollMode,
        expr: &str,
        seed: &Seed,
        breakdown: &[u32],
        claimed_total: Option<i32>,
    ) -> VerificationOutcome {
        let dice = match parse_dice(expr) {
            Ok(dice) => dice,
            Err(e) => {
                return VerificationOutcome::invalid(format!("invalid dice expression: {}", e));
            }
        };

        let expected_len = mode.breakdown_len(dice.count());
        if breakdown.len() != expected_len {
            return VerificationOutcome::invalid(format!(
                "expected {} dice, got {}",
                expected_len,
                breakdown.len()
            ));
        }

        let (first, second) = match self.sub_rolls(mode, &dice, seed) {
            Ok(rolls) => rolls,
            Err(e) => {
                return VerificationOutcome::invalid(format!("could not recompute roll: {}", e));
            }
        };

        let expected_total = match &second {
            None => first.total,
            Some(second) if mode == RollMode::Advantage => first.total.max(second.total),
            Some(second) => first.total.min(second.total),
        };

        let expected = first
            .breakdown
            .iter()
            .chain(second.iter().flat_map(|roll| roll.breakdown.iter()));

        for (index, (want, got)) in expected.zip(breakdown).enumerate() {
            if want != got {
                return VerificationOutcome::invalid(format!(
                    "die {} mismatch: expected {}, got {}",
                    index, want, got
                ));
            }
        }

        match claimed_total {
            Some(total) if total != expected_total => VerificationOutcome::invalid(format!(
                "total mismatch: expected {}, got {}",
                expected_total, total
            )),
            _ => VerificationOutcome::valid(),
        }
    }
}

fn log_outcome(mode: RollMode, expr: &str, seed: &Seed, outcome: &VerificationOutcome) {
    match &outcome.reason {
        None => debug!("Verified {} roll of {} with seed {}", mode, expr, seed),
        Some(reason) => warn!(
            "Rejected {} roll of {} with seed {}: {}",
            mode, expr, seed, reason
        ),
    }
}
