//! Confidence scoring
//!
//! `ConfidenceScorer` combines retrieval relevance, model certainty and two
//! bonus flags into a bounded score:
//!
//! ```text
//! confidence = clamp(w_r * max(retrieval) + w_m * model + bonuses, 0, 1)
//! ```
//!
//! The score is non-decreasing in every input. `Confidence` records every
//! change to an entity's score together with its cause.

use serde::{Deserialize, Serialize};

/// Weights and constants used by [`ConfidenceScorer`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of the best retrieval score
    pub retrieval_weight: f64,
    /// Weight of the model likelihood
    pub model_weight: f64,
    /// Model likelihood assumed when the model reported none
    pub fallback_model_likelihood: f64,
    /// Added when the source states the fact outright
    pub explicit_bonus: f64,
    /// Added when another extraction confirms the fact
    pub cross_validation_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            retrieval_weight: 0.4,
            model_weight: 0.4,
            fallback_model_likelihood: 0.7,
            explicit_bonus: 0.1,
            cross_validation_bonus: 0.1,
        }
    }
}

/// Pure confidence scorer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    /// Scorer with custom weights
    #[inline]
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Weights in use
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one fact.
    ///
    /// Inputs are clamped to [0, 1] and NaN counts as 0, so the result is
    /// always a finite value in [0, 1].
    #[must_use]
    pub fn score(
        &self,
        retrieval_scores: &[f64],
        model_likelihood: Option<f64>,
        explicit: bool,
        cross_validated: bool,
    ) -> f64 {
        let w = &self.weights;
        let retrieval = retrieval_scores
            .iter()
            .copied()
            .map(unit)
            .fold(0.0_f64, f64::max);
        let model = unit(model_likelihood.unwrap_or(w.fallback_model_likelihood));

        let mut bonus = 0.0;
        if explicit {
            bonus += w.explicit_bonus;
        }
        if cross_validated {
            bonus += w.cross_validation_bonus;
        }

        unit(w.retrieval_weight * retrieval + w.model_weight * model + bonus)
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Why a confidence value changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentCause {
    /// Computed from extraction signals
    Scored,
    /// A citation failed to resolve
    InvalidCitation,
    /// The entity could not be tied to a single step
    AmbiguousAssociation,
}

/// One recorded change to a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    /// What triggered the change
    pub cause: AdjustmentCause,
    /// Value before
    pub before: f64,
    /// Value after
    pub after: f64,
}

/// Bounded confidence with its change history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    value: f64,
    #[serde(default)]
    adjustments: Vec<ConfidenceAdjustment>,
}

impl Confidence {
    /// Initial confidence as reported by the extractor
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value: unit(value),
            adjustments: Vec::new(),
        }
    }

    /// Current value in [0, 1]
    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Every recorded change, oldest first
    #[inline]
    #[must_use]
    pub fn adjustments(&self) -> &[ConfidenceAdjustment] {
        &self.adjustments
    }

    /// Replace the value, recording the cause. Returns the new value.
    pub fn recompute(&mut self, cause: AdjustmentCause, value: f64) -> f64 {
        let after = unit(value);
        self.adjustments.push(ConfidenceAdjustment {
            cause,
            before: self.value,
            after,
        });
        self.value = after;
        after
    }

    /// Multiply the value by `factor`, recording the cause. Returns the new value.
    pub fn discount(&mut self, cause: AdjustmentCause, factor: f64) -> f64 {
        self.recompute(cause, self.value * factor)
    }

    /// Whether any adjustment lowered the value
    #[must_use]
    pub fn was_downgraded(&self) -> bool {
        self.adjustments
            .iter()
            .any(|a| a.cause != AdjustmentCause::Scored && a.after < a.before)
    }
}
