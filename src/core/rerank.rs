//! Composite-score re-ranking of retrieved evidence.
//!
//! Each active [`Signal`] is min-max normalized to `[0, 1]` across the
//! candidate set and the normalized signals are combined as a weighted
//! sum. Weights must sum to 1, so composite scores stay in `[0, 1]`.
//! Sorting is stable: equal scores keep the backend's original order.

use serde::{Deserialize, Serialize};

use super::evidence::Evidence;
use crate::error::AgentError;

/// Added to the denominator when every value in a signal is identical.
pub const NORMALIZE_EPSILON: f64 = 0.001;

/// Tolerance when checking that weights sum to 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A ranking signal extracted from [`Evidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Backend relevance score.
    Relevance,
    /// Last update time (newer ranks higher).
    Recency,
    /// Number of referencing documents.
    References,
}

impl Signal {
    /// Raw value of this signal for a candidate, if the candidate has one.
    #[allow(clippy::cast_precision_loss)]
    fn extract(self, evidence: &Evidence) -> Option<f64> {
        match self {
            Self::Relevance => Some(evidence.relevance_score),
            Self::Recency => evidence.updated_at.map(|t| t as f64),
            Self::References => evidence.num_references.map(f64::from),
        }
    }
}

/// Weight assigned to one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeight {
    /// The signal.
    pub signal: Signal,
    /// Its weight in `[0, 1]`.
    pub weight: f64,
}

/// Evidence with its composite re-rank score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEvidence {
    /// The retrieved evidence.
    #[serde(flatten)]
    pub evidence: Evidence,
    /// Composite score in `[0, 1]`.
    pub rank_score: f64,
}

/// Re-ranks evidence by a weighted sum of normalized signals.
#[derive(Debug, Clone)]
pub struct ReRanker {
    weights: Vec<SignalWeight>,
}

impl Default for ReRanker {
    /// Relevance only, weight 1.0.
    fn default() -> Self {
        Self {
            weights: vec![SignalWeight {
                signal: Signal::Relevance,
                weight: 1.0,
            }],
        }
    }
}

impl ReRanker {
    /// Creates a re-ranker from explicit signal weights.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] when no signal is given, a
    /// signal repeats, a weight is outside `[0, 1]`, or the weights do not
    /// sum to 1.
    pub fn new(weights: Vec<SignalWeight>) -> Result<Self, AgentError> {
        if weights.is_empty() {
            return Err(AgentError::InvalidConfig {
                message: "re-ranking needs at least one weighted signal".to_string(),
            });
        }
        for (i, w) in weights.iter().enumerate() {
            if !(0.0..=1.0).contains(&w.weight) {
                return Err(AgentError::InvalidConfig {
                    message: format!("weight for {:?} must be in [0, 1], got {}", w.signal, w.weight),
                });
            }
            if weights[..i].iter().any(|other| other.signal == w.signal) {
                return Err(AgentError::InvalidConfig {
                    message: format!("signal {:?} is weighted more than once", w.signal),
                });
            }
        }
        let sum: f64 = weights.iter().map(|w| w.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AgentError::InvalidConfig {
                message: format!("re-ranking weights must sum to 1, got {sum}"),
            });
        }
        Ok(Self { weights })
    }

    /// Returns the configured weights.
    #[must_use]
    pub fn weights(&self) -> &[SignalWeight] {
        &self.weights
    }

    /// Scores, sorts and truncates `candidates` to at most `top_k` items.
    #[must_use]
    pub fn rerank(&self, candidates: Vec<Evidence>, top_k: usize) -> Vec<RankedEvidence> {
        let mut scores = vec![0.0_f64; candidates.len()];

        for w in &self.weights {
            let raw: Vec<Option<f64>> = candidates.iter().map(|e| w.signal.extract(e)).collect();
            for (score, value) in scores.iter_mut().zip(normalize_optional(&raw)) {
                *score += value * w.weight;
            }
        }

        let mut ranked: Vec<RankedEvidence> = candidates
            .into_iter()
            .zip(scores)
            .map(|(evidence, score)| RankedEvidence {
                evidence,
                rank_score: score.clamp(0.0, 1.0),
            })
            .collect();

        // `sort_by` is stable, so ties keep retrieval order.
        ranked.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));
        ranked.truncate(top_k);
        ranked
    }
}

/// Min-max normalizes `values` to `[0, 1]`.
///
/// When every value is equal the denominator is nudged by
/// [`NORMALIZE_EPSILON`], which maps all of them to 0.
#[must_use]
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max = values.iter().copied().fold(min, f64::max);
    let denom = if (max - min).abs() < f64::EPSILON {
        NORMALIZE_EPSILON
    } else {
        max - min
    };
    values.iter().map(|v| (v - min) / denom).collect()
}

/// Normalizes the present values; missing and non-finite values score 0.
fn normalize_optional(values: &[Option<f64>]) -> Vec<f64> {
    let values: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let mut normalized = normalize(&present).into_iter();
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                normalized.next().unwrap_or(0.0)
            } else {
                0.0
            }
        })
        .collect()
}
