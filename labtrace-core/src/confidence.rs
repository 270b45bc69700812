//! Confidence evaluation.
//!
//! Confidence starts at 1.0 and every applicable rule of the policy adds a
//! signed [`ScoreModifier`]. The modifiers are applied in a fixed order
//! (hints, retries, solution, first-try bonus) and the result is clamped to
//! `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::metrics::StepMetrics;
use crate::policy::ScoringPolicy;

/// Confidence before any modifier is applied.
pub const BASE_CONFIDENCE: f64 = 1.0;

/// Kind of adjustment applied to a step's confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    HintsUsed,
    Retries,
    SolutionViewed,
    FirstTryBonus,
}

impl ModifierKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HintsUsed => "hints_used",
            Self::Retries => "retries",
            Self::SolutionViewed => "solution_viewed",
            Self::FirstTryBonus => "first_try_bonus",
        }
    }
}

/// A named, signed adjustment to confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreModifier {
    pub kind: ModifierKind,
    /// Signed change applied to confidence
    pub delta: f64,
    /// Human-readable explanation
    pub note: String,
}

/// Output of [`evaluate_confidence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    /// Final confidence in `[0, 1]`
    pub confidence: f64,
    pub modifiers: Vec<ScoreModifier>,
}

impl ConfidenceResult {
    /// Whether a modifier of the given kind was applied.
    #[must_use]
    pub fn has(&self, kind: ModifierKind) -> bool {
        self.modifiers.iter().any(|m| m.kind == kind)
    }
}

/// Score one step's metrics under a policy.
#[must_use]
pub fn evaluate_confidence(metrics: &StepMetrics, policy: &ScoringPolicy) -> ConfidenceResult {
    let mut modifiers = Vec::new();
    let mut running = BASE_CONFIDENCE;

    if metrics.hints_revealed > 0 {
        let penalty = policy.hint_penalty.total(metrics.hints_revealed);
        if penalty > 0.0 {
            running -= penalty;
            modifiers.push(ScoreModifier {
                kind: ModifierKind::HintsUsed,
                delta: -penalty,
                note: format!(
                    "{} hint{} revealed",
                    metrics.hints_revealed,
                    plural(metrics.hints_revealed)
                ),
            });
        }
    }

    let retries = metrics.retries();
    if retries > 0 {
        let penalty = policy.retry_penalty.total(retries);
        if penalty > 0.0 {
            running -= penalty;
            modifiers.push(ScoreModifier {
                kind: ModifierKind::Retries,
                delta: -penalty,
                note: format!("{retries} extra attempt{}", plural(retries)),
            });
        }
    }

    if metrics.solution_viewed {
        let mut delta = -policy.solution_penalty.penalty;
        let mut note = "solution viewed".to_string();
        if let Some(cap) = policy.solution_penalty.cap
            && running + delta > cap
        {
            delta = cap - running;
            note = format!("solution viewed (capped at {cap:.2})");
        }
        running += delta;
        modifiers.push(ScoreModifier {
            kind: ModifierKind::SolutionViewed,
            delta,
            note,
        });
    }

    // Solution view already rules this out via is_first_try_success
    if metrics.is_first_try_success() && policy.first_try_bonus > 0.0 {
        running += policy.first_try_bonus;
        modifiers.push(ScoreModifier {
            kind: ModifierKind::FirstTryBonus,
            delta: policy.first_try_bonus,
            note: "passed on the first try without help".to_string(),
        });
    }

    ConfidenceResult {
        confidence: clamp_unit(running),
        modifiers,
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}
