// This is the dice module - it contains ALL the business logic for dice rolling.
// Notice how this module has NO Discord-specific code (no serenity, no poise imports).
// It works with primitive types (u32, u64, String) so it could theoretically be used
// in a web app, CLI tool, or any other frontend.

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// BOUNDS
// ============================================================================
// One bound set, enforced everywhere (slash command and re-roll control alike).

pub const MIN_COUNT: u32 = 1;
pub const MAX_COUNT: u32 = 100;
pub const MIN_FACES: u32 = 2;
pub const MAX_FACES: u32 = 1000;

/// How long a roll keeps its "roll again" control available.
pub const REROLL_WINDOW: Duration = Duration::from_secs(60);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("dice notation must look like `2d6`")]
    InvalidFormat,

    #[error("dice are limited to {MIN_COUNT}-{MAX_COUNT} dice with {MIN_FACES}-{MAX_FACES} faces")]
    OutOfRange,

    #[error("only the original roller may roll again")]
    NotAuthorized,

    #[error("the re-roll window has closed")]
    WindowClosed,
}

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A parsed `<count>d<faces>` expression. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpression {
    count: u32,
    faces: u32,
}

fn notation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Case-insensitive for the `d`, anchored - no surrounding whitespace tolerance.
    PATTERN.get_or_init(|| Regex::new(r"^(?i)(\d+)d(\d+)$").unwrap())
}

impl DiceExpression {
    /// Parse dice notation like `4d6` or `1D20`.
    ///
    /// Fails with `InvalidFormat` when the text does not match the notation at
    /// all, and with `OutOfRange` when it does but the numbers fall outside
    /// the allowed bounds.
    pub fn parse(text: &str) -> Result<Self, DiceError> {
        let captures = notation_pattern()
            .captures(text)
            .ok_or(DiceError::InvalidFormat)?;

        // The pattern guarantees digits; anything too large for u32 is simply
        // out of range.
        let count: u32 = captures[1].parse().map_err(|_| DiceError::OutOfRange)?;
        let faces: u32 = captures[2].parse().map_err(|_| DiceError::OutOfRange)?;

        if !(MIN_COUNT..=MAX_COUNT).contains(&count) || !(MIN_FACES..=MAX_FACES).contains(&faces) {
            return Err(DiceError::OutOfRange);
        }

        Ok(Self { count, faces })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn faces(&self) -> u32 {
        self.faces
    }

    /// Roll the dice: `count` independent uniform draws in `[1, faces]`.
    ///
    /// The randomness source is supplied by the caller so tests can seed it.
    /// Pure apart from advancing the rng - no side effects.
    pub fn evaluate(&self, rng: &mut impl Rng) -> RollResult {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.faces))
            .collect();
        let total = rolls.iter().map(|&r| u64::from(r)).sum();

        RollResult {
            expression: *self,
            rolls,
            total,
        }
    }
}

/// The outcome of evaluating a [`DiceExpression`]. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResult {
    pub expression: DiceExpression,
    pub rolls: Vec<u32>,
    pub total: u64,
}

/// Special outcome of a single d20, used by presentation for crit styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CritOutcome {
    /// A natural 20 on a single d20.
    Hit,
    /// A natural 1 on a single d20.
    Miss,
}

impl RollResult {
    /// Classify a critical hit/failure. Only a single d20 qualifies.
    pub fn crit(&self) -> Option<CritOutcome> {
        if self.expression.count != 1 || self.expression.faces != 20 {
            return None;
        }

        match self.rolls.first() {
            Some(20) => Some(CritOutcome::Hit),
            Some(1) => Some(CritOutcome::Miss),
            _ => None,
        }
    }
}

// ============================================================================
// RE-ROLL CONTROL
// ============================================================================
// A roll stays re-rollable for a short window after it is made. The control
// only exposes transition methods; rendering the button is the Discord
// layer's problem.

/// Gates "roll again" requests: same roller only, and only while the window
/// is open.
#[derive(Debug)]
pub struct RollControl {
    owner: u64,
    expression: DiceExpression,
    deadline: Instant,
}

impl RollControl {
    pub fn new(owner: u64, expression: DiceExpression, now: Instant) -> Self {
        Self {
            owner,
            expression,
            deadline: now + REROLL_WINDOW,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Re-roll the original expression, if `actor` is the owner and the
    /// window is still open at `now`.
    pub fn reroll(
        &self,
        actor: u64,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Result<RollResult, DiceError> {
        if actor != self.owner {
            return Err(DiceError::NotAuthorized);
        }
        if now >= self.deadline {
            return Err(DiceError::WindowClosed);
        }

        Ok(self.expression.evaluate(rng))
    }
}

// ============================================================================
// TESTS
// ============================================================================
