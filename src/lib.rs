//! fairdice - provably fair dice engine
//!
//! Turns a dice expression and a seed into a deterministic, unbiased,
//! independently verifiable roll.
//!
//! ```
//! use fairdice::dice::DiceService;
//!
//! let dice = DiceService::new();
//! let roll = dice.roll("2d6+3", Some("fixed-seed-A".into())).unwrap();
//! assert_eq!(roll.breakdown, vec![4, 4]);
//! assert_eq!(roll.total, 11);
//! assert!(dice.verify("2d6+3", &roll.seed, &roll.breakdown));
//! ```

pub mod config;
pub mod dice;

pub use config::Config;
pub use dice::{DiceError, DiceService, RollMode, RollResult, Seed, VerificationOutcome};
