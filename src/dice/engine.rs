//! Roll engine
//!
//! Ties parsing, seeding and sampling together into complete rolls, and
//! composes paired rolls for advantage/disadvantage.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::expression::{parse_dice, DiceRoll};
use super::sampler::{sample_die, DrawSource, Sha256Draw};
use super::seed::{derive_seed, generate_seed, EntropySource, Seed, SystemEntropy};
use super::DiceError;

/// How a roll is produced from its expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollMode {
    /// Roll once
    #[default]
    Normal,
    /// Roll twice from derived seeds, keep the higher total
    Advantage,
    /// Roll twice from derived seeds, keep the lower total
    Disadvantage,
}

impl RollMode {
    /// Derivation labels for the two sub-rolls, if this mode uses them.
    ///
    /// Advantage and disadvantage never share labels, so the same root seed
    /// yields unrelated sub-rolls for each.
    pub fn labels(&self) -> Option<(&'static str, &'static str)> {
        match self {
            RollMode::Normal => None,
            RollMode::Advantage => Some(("advantage_1", "advantage_2")),
            RollMode::Disadvantage => Some(("disadvantage_1", "disadvantage_2")),
        }
    }

    /// Number of breakdown entries a roll of `count` dice produces in this mode
    pub fn breakdown_len(&self, count: u32) -> usize {
        match self {
            RollMode::Normal => count as usize,
            RollMode::Advantage | RollMode::Disadvantage => 2 * count as usize,
        }
    }
}

impl std::fmt::Display for RollMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollMode::Normal => write!(f, "normal"),
            RollMode::Advantage => write!(f, "advantage"),
            RollMode::Disadvantage => write!(f, "disadvantage"),
        }
    }
}

/// Outcome of a roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    /// Dice sum plus modifier (the kept sub-roll's total for paired rolls)
    #[serde(alias = "result")]
    pub total: i32,
    /// Individual die results in roll order
    pub breakdown: Vec<u32>,
    /// Seed the roll was produced from (the root seed for paired rolls)
    pub seed: Seed,
}

/// Stateless dice service.
///
/// Holds only its entropy and draw backends; every roll is a pure function
/// of expression and seed, so one service can be shared freely across
/// threads.
pub struct DiceService {
    entropy: Box<dyn EntropySource>,
    draws: Box<dyn DrawSource>,
}

impl Default for DiceService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiceService").finish_non_exhaustive()
    }
}

impl DiceService {
    /// Create a service backed by system entropy and SHA-256 draws
    pub fn new() -> Self {
        Self {
            entropy: Box::new(SystemEntropy),
            draws: Box::new(Sha256Draw),
        }
    }

    /// Replace the entropy backend used for fresh seeds
    pub fn with_entropy(mut self, entropy: impl EntropySource + 'static) -> Self {
        self.entropy = Box::new(entropy);
        self
    }

    /// Replace the draw backend. Rolls made with anything other than
    /// [`Sha256Draw`] will not verify against other implementations.
    pub fn with_draws(mut self, draws: impl DrawSource + 'static) -> Self {
        self.draws = Box::new(draws);
        self
    }

    /// Generate a fresh root seed
    pub fn generate_seed(&self) -> Seed {
        generate_seed(self.entropy.as_ref())
    }

    /// Derive a child seed from `parent` and a context label
    pub fn derive_seed(&self, parent: &Seed, label: &str) -> Seed {
        derive_seed(parent, label)
    }

    /// Sample a single die
    pub fn sample_die(&self, seed: &Seed, die_index: u32, sides: u32) -> Result<u32, DiceError> {
        sample_die(self.draws.as_ref(), seed, die_index, sides)
    }

    /// Roll dice from an expression, generating a seed if none is given
    pub fn roll(&self, expr: &str, seed: Option<Seed>) -> Result<RollResult, DiceError> {
        let dice = parse_dice(expr)?;
        let seed = self.resolve_seed(seed);
        self.roll_parsed(&dice, seed)
    }

    /// Roll an already validated expression with a known seed
    pub fn roll_parsed(&self, dice: &DiceRoll, seed: Seed) -> Result<RollResult, DiceError> {
        let breakdown = self.breakdown(dice, &seed)?;
        let sum: i32 = breakdown.iter().map(|&die| die as i32).sum();
        let total = sum + dice.modifier();

        debug!("Rolled {} with seed {}: {:?} = {}", dice, seed, breakdown, total);

        Ok(RollResult {
            total,
            breakdown,
            seed,
        })
    }

    /// Roll twice and keep the higher total
    pub fn roll_with_advantage(
        &self,
        expr: &str,
        seed: Option<Seed>,
    ) -> Result<RollResult, DiceError> {
        self.roll_with_mode(RollMode::Advantage, expr, seed)
    }

    /// Roll twice and keep the lower total
    pub fn roll_with_disadvantage(
        &self,
        expr: &str,
        seed: Option<Seed>,
    ) -> Result<RollResult, DiceError> {
        self.roll_with_mode(RollMode::Disadvantage, expr, seed)
    }

    /// Roll in the given mode
    pub fn roll_with_mode(
        &self,
        mode: RollMode,
        expr: &str,
        seed: Option<Seed>,
    ) -> Result<RollResult, DiceError> {
        let dice = parse_dice(expr)?;
        let root = self.resolve_seed(seed);

        let (first, second) = match self.sub_rolls(mode, &dice, &root)? {
            (first, Some(second)) => (first, second),
            (single, None) => return Ok(single),
        };

        let keep_first = match mode {
            RollMode::Advantage => first.total >= second.total,
            _ => first.total <= second.total,
        };
        let total = if keep_first { first.total } else { second.total };

        debug!(
            "{} roll of {} with seed {}: {} vs {}, kept {}",
            mode, dice, root, first.total, second.total, total
        );

        let mut breakdown = first.breakdown;
        breakdown.extend(second.breakdown);

        Ok(RollResult {
            total,
            breakdown,
            seed: root,
        })
    }

    /// Reproduce the sub-rolls behind a roll in `mode`: one roll on the root
    /// seed for normal mode, two rolls on derived seeds otherwise.
    pub(crate) fn sub_rolls(
        &self,
        mode: RollMode,
        dice: &DiceRoll,
        root: &Seed,
    ) -> Result<(RollResult, Option<RollResult>), DiceError> {
        match mode.labels() {
            None => Ok((self.roll_parsed(dice, root.clone())?, None)),
            Some((first_label, second_label)) => {
                let first = self.roll_parsed(dice, derive_seed(root, first_label))?;
                let second = self.roll_parsed(dice, derive_seed(root, second_label))?;
                Ok((first, Some(second)))
            }
        }
    }

    fn breakdown(&self, dice: &DiceRoll, seed: &Seed) -> Result<Vec<u32>, DiceError> {
        (0..dice.count())
            .map(|die_index| self.sample_die(seed, die_index, dice.sides()))
            .collect()
    }

    /// An empty seed counts as no seed
    fn resolve_seed(&self, seed: Option<Seed>) -> Seed {
        seed.filter(|s| !s.as_str().is_empty())
            .unwrap_or_else(|| self.generate_seed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{ExpressionError, SEED_BYTES};

    struct ConstDraw(u32);

    impl DrawSource for ConstDraw {
        fn draw(&self, _seed: &Seed, _die_index: u32, _attempt: u32) -> u32 {
            self.0
        }
    }

    struct ZeroEntropy;

    impl EntropySource for ZeroEntropy {
        fn fill(&self, buf: &mut [u8; SEED_BYTES]) {
            buf.fill(0);
        }
    }

    #[test]
    fn test_golden_roll() {
        let service = DiceService::new();
        let result = service.roll("2d6+3", Some("fixed-seed-A".into())).unwrap();

        assert_eq!(result.breakdown, vec![4, 4]);
        assert_eq!(result.total, 11);
        assert_eq!(result.seed.as_str(), "fixed-seed-A");
    }

    #[test]
    fn test_roll_generates_seed() {
        let service = DiceService::new();
        let result = service.roll("1d6", None).unwrap();

        assert_eq!(result.seed.as_str().len(), 64);
        assert_eq!(result.breakdown.len(), 1);
        assert!((1..=6).contains(&result.total));
    }

    #[test]
    fn test_empty_seed_is_replaced() {
        let service = DiceService::new().with_entropy(ZeroEntropy);
        let result = service.roll_with_advantage("1d20", Some("".into())).unwrap();
        assert_eq!(result.seed.as_str(), "0".repeat(64));
    }

    #[test]
    fn test_injected_entropy_seed() {
        let service = DiceService::new().with_entropy(ZeroEntropy);
        let result = service.roll("1d6", None).unwrap();
        assert_eq!(result.seed.as_str(), "0".repeat(64));
    }

    #[test]
    fn test_roll_with_modifier() {
        let service = DiceService::new();
        for i in 0..100 {
            let result = service.roll("1d6-2", Some(format!("mod-{}", i).into())).unwrap();
            assert_eq!(result.total, result.breakdown[0] as i32 - 2);
            assert!(result.total >= -1, "Roll {} below minimum -1", result.total);
            assert!(result.total <= 4, "Roll {} above maximum 4", result.total);
        }
    }

    #[test]
    fn test_invalid_expression_propagates() {
        let service = DiceService::new();
        let err = service.roll("101d6", None).unwrap_err();
        assert_eq!(err, DiceError::Expression(ExpressionError::TooManyDice));

        let err = service.roll_with_advantage("2x6", None).unwrap_err();
        assert!(matches!(
            err,
            DiceError::Expression(ExpressionError::Format(_))
        ));
    }

    #[test]
    fn test_golden_advantage() {
        let service = DiceService::new();
        let result = service
            .roll_with_advantage("1d20", Some("advantage-test".into()))
            .unwrap();

        assert_eq!(result.breakdown, vec![5, 2]);
        assert_eq!(result.total, 5);
        assert_eq!(result.seed.as_str(), "advantage-test");
    }

    #[test]
    fn test_golden_disadvantage() {
        let service = DiceService::new();
        let result = service
            .roll_with_disadvantage("1d20", Some("advantage-test".into()))
            .unwrap();

        assert_eq!(result.breakdown, vec![19, 17]);
        assert_eq!(result.total, 17);
        assert_eq!(result.seed.as_str(), "advantage-test");
    }

    #[test]
    fn test_paired_ties_keep_first() {
        // Every die lands on 1, so both sub-rolls tie
        let service = DiceService::new().with_draws(ConstDraw(0));
        let adv = service.roll_with_advantage("2d6+1", Some("tie".into())).unwrap();
        let dis = service.roll_with_disadvantage("2d6+1", Some("tie".into())).unwrap();

        assert_eq!(adv.total, 3);
        assert_eq!(dis.total, 3);
        assert_eq!(adv.breakdown, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_normal_mode_matches_roll() {
        let service = DiceService::new();
        let seed: Seed = "mode-normal".into();
        assert_eq!(
            service.roll_with_mode(RollMode::Normal, "3d8", Some(seed.clone())).unwrap(),
            service.roll("3d8", Some(seed)).unwrap()
        );
    }

    #[test]
    fn test_mode_labels_disjoint() {
        let (a1, a2) = RollMode::Advantage.labels().unwrap();
        let (d1, d2) = RollMode::Disadvantage.labels().unwrap();
        assert!(RollMode::Normal.labels().is_none());
        for label in [a1, a2] {
            assert_ne!(label, d1);
            assert_ne!(label, d2);
        }
    }

    #[test]
    fn test_sampling_exhaustion_fails_roll() {
        let service = DiceService::new().with_draws(ConstDraw(u32::MAX));
        let err = service.roll("1d6", Some("broken".into())).unwrap_err();
        assert!(matches!(
            err,
            DiceError::SamplingExhausted {
                die_index: 0,
                sides: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_degenerate_dice_never_roll() {
        let service = DiceService::new();
        let seed: Seed = "degenerate".into();
        for sides in [0, 1] {
            assert_eq!(
                service.sample_die(&seed, 0, sides),
                Err(DiceError::Expression(ExpressionError::TooFewSides))
            );
        }

        // A d0 cannot be smuggled in through a serialized expression either
        let d0 = r#"{"count": 1, "sides": 0, "modifier": 0}"#;
        assert!(serde_json::from_str::<DiceRoll>(d0).is_err());
        let dice: DiceRoll =
            serde_json::from_str(r#"{"count": 2, "sides": 6, "modifier": 3}"#).unwrap();
        assert_eq!(service.roll_parsed(&dice, seed).unwrap().breakdown.len(), 2);
    }

    #[test]
    fn test_result_json_shape() {
        let result = RollResult {
            total: 11,
            breakdown: vec![4, 4],
            seed: "fixed-seed-A".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"total": 11, "breakdown": [4, 4], "seed": "fixed-seed-A"})
        );

        // Payloads using the older `result` field name still deserialize
        let legacy: RollResult =
            serde_json::from_str(r#"{"result": 11, "breakdown": [4, 4], "seed": "fixed-seed-A"}"#)
                .unwrap();
        assert_eq!(legacy, result);
    }
}
