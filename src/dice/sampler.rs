//! Fair die sampling
//!
//! Each die draws `u32` values from `sha256("{seed}:{die_index}:{attempt}")`
//! (first four bytes, big-endian) and rejects draws at or above the largest
//! multiple of `sides` below 2^32, so `v % sides` carries no modulo bias.
//! The draw format is part of the verification contract and must not change.

use sha2::{Digest, Sha256};
use tracing::error;

use super::expression::{ExpressionError, MAX_SIDES, MIN_SIDES};
use super::seed::Seed;
use super::DiceError;

/// Retries allowed after the first draw for a single die
pub const MAX_ATTEMPTS: u32 = 1000;

const UINT32_RANGE: u64 = 1 << 32;

/// Deterministic source of 32-bit draws keyed by (seed, die index, attempt)
pub trait DrawSource: Send + Sync {
    fn draw(&self, seed: &Seed, die_index: u32, attempt: u32) -> u32;
}

/// The standard draw backend: SHA-256 over `"{seed}:{die_index}:{attempt}"`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Draw;

impl DrawSource for Sha256Draw {
    fn draw(&self, seed: &Seed, die_index: u32, attempt: u32) -> u32 {
        let digest = Sha256::digest(format!("{}:{}:{}", seed, die_index, attempt).as_bytes());
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

/// Sample one die in `[1, sides]`.
///
/// `sides` is held to the same range as a parsed expression, so a d0 or d1
/// is an error here too.
pub fn sample_die(
    draws: &dyn DrawSource,
    seed: &Seed,
    die_index: u32,
    sides: u32,
) -> Result<u32, DiceError> {
    if sides < MIN_SIDES {
        return Err(ExpressionError::TooFewSides.into());
    }
    if sides > MAX_SIDES {
        return Err(ExpressionError::TooManySides.into());
    }

    let sides_wide = u64::from(sides);
    let limit = UINT32_RANGE - (UINT32_RANGE % sides_wide);

    for attempt in 0..=MAX_ATTEMPTS {
        let value = u64::from(draws.draw(seed, die_index, attempt));
        if value < limit {
            return Ok((value % sides_wide) as u32 + 1);
        }
    }

    error!(
        "Rejection sampling exhausted for die {} (d{}) with seed {}",
        die_index, sides, seed
    );
    Err(DiceError::SamplingExhausted {
        die_index,
        sides,
        attempts: MAX_ATTEMPTS + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Always returns the same draw
    struct ConstDraw(u32);

    impl DrawSource for ConstDraw {
        fn draw(&self, _seed: &Seed, _die_index: u32, _attempt: u32) -> u32 {
            self.0
        }
    }

    /// Rejects the first `reject` draws, then returns `accept`
    struct RejectThen {
        reject: u32,
        accept: u32,
        calls: AtomicU32,
    }

    impl DrawSource for RejectThen {
        fn draw(&self, _seed: &Seed, _die_index: u32, attempt: u32) -> u32 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if attempt < self.reject {
                u32::MAX
            } else {
                self.accept
            }
        }
    }

    #[test]
    fn test_sha256_draw_matches_reference() {
        // First four bytes of sha256("fixed-seed-A:0:0")
        let seed = Seed::from("fixed-seed-A");
        assert_eq!(Sha256Draw.draw(&seed, 0, 0), 0x01ae_04af);
    }

    #[test]
    fn test_sample_deterministic() {
        let seed = Seed::from("determinism");
        for index in 0..50 {
            let a = sample_die(&Sha256Draw, &seed, index, 20).unwrap();
            let b = sample_die(&Sha256Draw, &seed, index, 20).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_sample_bounds() {
        let seed = Seed::from("bounds");
        for sides in [2, 3, 6, 7, 20, 100, 999, 1000] {
            for index in 0..200 {
                let roll = sample_die(&Sha256Draw, &seed, index, sides).unwrap();
                assert!(
                    (1..=sides).contains(&roll),
                    "Roll {} out of range for d{}",
                    roll,
                    sides
                );
            }
        }
    }

    #[test]
    fn test_value_mapping() {
        let seed = Seed::from("any");
        assert_eq!(sample_die(&ConstDraw(0), &seed, 0, 6).unwrap(), 1);
        assert_eq!(sample_die(&ConstDraw(5), &seed, 0, 6).unwrap(), 6);
        assert_eq!(sample_die(&ConstDraw(6), &seed, 0, 6).unwrap(), 1);
        // 2^32 is divisible by 2, so nothing is rejected for a d2
        assert_eq!(sample_die(&ConstDraw(u32::MAX), &seed, 0, 2).unwrap(), 2);
    }

    #[test]
    fn test_rejects_biased_tail() {
        // For a d6 the limit is 2^32 - 4; the top four draws are rejected
        let seed = Seed::from("any");
        let draws = RejectThen {
            reject: 3,
            accept: 4,
            calls: AtomicU32::new(0),
        };
        assert_eq!(sample_die(&draws, &seed, 0, 6).unwrap(), 5);
        assert_eq!(draws.calls.load(Ordering::Relaxed), 4);

        let limit = (UINT32_RANGE - UINT32_RANGE % 6) as u32;
        assert!(sample_die(&ConstDraw(limit - 1), &seed, 0, 6).is_ok());
        assert!(sample_die(&ConstDraw(limit), &seed, 0, 6).is_err());
    }

    #[test]
    fn test_accepts_on_final_attempt() {
        let seed = Seed::from("any");
        let draws = RejectThen {
            reject: MAX_ATTEMPTS,
            accept: 0,
            calls: AtomicU32::new(0),
        };
        assert_eq!(sample_die(&draws, &seed, 0, 6).unwrap(), 1);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let seed = Seed::from("any");
        let draws = RejectThen {
            reject: u32::MAX,
            accept: 0,
            calls: AtomicU32::new(0),
        };

        let err = sample_die(&draws, &seed, 7, 6).unwrap_err();
        assert_eq!(
            err,
            DiceError::SamplingExhausted {
                die_index: 7,
                sides: 6,
                attempts: MAX_ATTEMPTS + 1,
            }
        );
        assert_eq!(draws.calls.load(Ordering::Relaxed), MAX_ATTEMPTS + 1);
    }

    #[test]
    fn test_sides_out_of_range() {
        let seed = Seed::from("any");
        for sides in [0, 1] {
            assert_eq!(
                sample_die(&Sha256Draw, &seed, 0, sides),
                Err(DiceError::Expression(ExpressionError::TooFewSides))
            );
        }
        assert_eq!(
            sample_die(&Sha256Draw, &seed, 0, MAX_SIDES + 1),
            Err(DiceError::Expression(ExpressionError::TooManySides))
        );
        assert!(sample_die(&Sha256Draw, &seed, 0, MIN_SIDES).is_ok());
        assert!(sample_die(&Sha256Draw, &seed, 0, MAX_SIDES).is_ok());
    }

    #[test]
    fn test_uniform_faces() {
        let seed = Seed::from("uniformity");
        let mut counts = [0u32; 6];
        for index in 0..6000 {
            let roll = sample_die(&Sha256Draw, &seed, index, 6).unwrap();
            counts[(roll - 1) as usize] += 1;
        }
        for (face, count) in counts.iter().enumerate() {
            assert!(
                (800..=1200).contains(count),
                "Face {} appeared {} times out of 6000",
                face + 1,
                count
            );
        }
    }
}
