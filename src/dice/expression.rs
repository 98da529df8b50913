//! Dice expression parsing
//!
//! Parses and validates dice notation like "2d6+3", "1d20", "4d6 - 2".
//! Parsing is pure: no randomness, no I/O.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Fewest dice an expression may roll
pub const MIN_DICE: u32 = 1;

/// Most dice an expression may roll
pub const MAX_DICE: u32 = 100;

/// Fewest sides a die may have
pub const MIN_SIDES: u32 = 2;

/// Most sides a die may have
pub const MAX_SIDES: u32 = 1000;

/// Largest modifier magnitude, applied symmetrically to both signs
pub const MAX_MODIFIER: i32 = 10_000;

/// `<count>d<sides>[+|-<modifier>]`, with whitespace allowed around the
/// expression and around the modifier sign only.
static DICE_EXPR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([0-9]+)d([0-9]+)\s*(?:([+-])\s*([0-9]+))?\s*$").unwrap()
});

/// Reasons a dice expression is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("expression must be a non-empty string")]
    Empty,

    #[error(
        "expression must be in format NdM, NdM+K or NdM-K (e.g. \"2d6+3\", \"1d20-1\"), got {0:?}"
    )]
    Format(String),

    #[error("too few dice: must roll at least {}", MIN_DICE)]
    TooFewDice,

    #[error("too many dice: at most {} may be rolled", MAX_DICE)]
    TooManyDice,

    #[error("too few sides: a die needs at least {}", MIN_SIDES)]
    TooFewSides,

    #[error("too many sides: a die may have at most {}", MAX_SIDES)]
    TooManySides,

    #[error("modifier must be between -{} and {}", MAX_MODIFIER, MAX_MODIFIER)]
    ModifierOutOfRange,
}

impl ExpressionError {
    /// True for well-formed expressions whose numbers fall outside policy
    /// limits, false for malformed text.
    pub fn is_range_error(&self) -> bool {
        !matches!(self, ExpressionError::Empty | ExpressionError::Format(_))
    }
}

/// A parsed and range-checked dice expression.
///
/// Every instance is within the policy limits, including ones deserialized
/// from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDiceRoll")]
pub struct DiceRoll {
    count: u32,
    sides: u32,
    modifier: i32,
}

/// Unchecked wire form of [`DiceRoll`]
#[derive(Deserialize)]
struct RawDiceRoll {
    count: u32,
    sides: u32,
    #[serde(default)]
    modifier: i32,
}

impl TryFrom<RawDiceRoll> for DiceRoll {
    type Error = ExpressionError;

    fn try_from(raw: RawDiceRoll) -> Result<Self, Self::Error> {
        DiceRoll::new(raw.count, raw.sides, raw.modifier)
    }
}

impl DiceRoll {
    /// Build a dice roll, enforcing the same limits as [`parse_dice`]
    pub fn new(count: u32, sides: u32, modifier: i32) -> Result<Self, ExpressionError> {
        if count < MIN_DICE {
            return Err(ExpressionError::TooFewDice);
        }
        if count > MAX_DICE {
            return Err(ExpressionError::TooManyDice);
        }
        if sides < MIN_SIDES {
            return Err(ExpressionError::TooFewSides);
        }
        if sides > MAX_SIDES {
            return Err(ExpressionError::TooManySides);
        }
        if modifier.unsigned_abs() > MAX_MODIFIER.unsigned_abs() {
            return Err(ExpressionError::ModifierOutOfRange);
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Number of dice to roll
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of sides per die
    pub fn sides(&self) -> u32 {
        self.sides
    }

    /// Modifier to add/subtract
    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i32 {
        (self.count * self.sides) as i32 + self.modifier
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i32 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.modifier as f64).floor() as i32
    }
}

impl FromStr for DiceRoll {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dice(s)
    }
}

impl std::fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifier > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.modifier)
        } else if self.modifier < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.modifier)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Parse a dice notation string like "2d6+3"
///
/// # Examples
/// ```
/// use fairdice::dice::parse_dice;
///
/// let roll = parse_dice("2D6 + 3").unwrap();
/// assert_eq!((roll.count(), roll.sides(), roll.modifier()), (2, 6, 3));
///
/// assert!(parse_dice("d6").is_err());    // Missing count
/// assert!(parse_dice("101d6").is_err()); // Too many dice
/// ```
pub fn parse_dice(notation: &str) -> Result<DiceRoll, ExpressionError> {
    if notation.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }

    let caps = DICE_EXPR_REGEX
        .captures(notation)
        .ok_or_else(|| ExpressionError::Format(notation.to_string()))?;

    // The grammar admits only digit runs here, so a failed parse is overflow
    let count: u32 = caps[1].parse().map_err(|_| ExpressionError::TooManyDice)?;
    let sides: u32 = caps[2].parse().map_err(|_| ExpressionError::TooManySides)?;

    let modifier = match (caps.get(3), caps.get(4)) {
        (Some(sign), Some(digits)) => {
            let magnitude: i32 = digits
                .as_str()
                .parse()
                .map_err(|_| ExpressionError::ModifierOutOfRange)?;
            if sign.as_str() == "-" {
                -magnitude
            } else {
                magnitude
            }
        }
        _ => 0,
    };

    DiceRoll::new(count, sides, modifier)
}
