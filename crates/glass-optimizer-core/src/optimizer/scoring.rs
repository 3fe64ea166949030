use super::Optimizer;
use crate::config::{ConfidenceParams, OptimizerConfig};
use crate::geometry::EPSILON;
use crate::types::{ConfidenceLevel, OptimizationContext, OptimizationResult, QualityScore};

const PLATE_COUNT_WEIGHT: f64 = 0.6;
const UTILIZATION_WEIGHT: f64 = 0.4;
const WASTE_AMOUNT_WEIGHT: f64 = 0.6;
const REUSABLE_SHARE_WEIGHT: f64 = 0.4;

/// Scores one plan under `context`. `confidence` is left at 0; it only means
/// something relative to the other candidates, see [`score_all`].
pub fn score(
    result: &OptimizationResult,
    context: OptimizationContext,
    config: &OptimizerConfig,
) -> QualityScore {
    if result.is_empty() {
        return QualityScore::default();
    }

    let compactness_score = compactness(result);
    let waste_score = waste(result);
    let cut_score = cuts(result);

    let weights = config.weights.for_context(context);
    let weight_sum = weights.sum();
    let total_score = if weight_sum > 0.0 {
        (weights.compactness * compactness_score
            + weights.waste * waste_score
            + weights.cut * cut_score)
            / weight_sum
    } else {
        0.0
    };

    QualityScore {
        total_score: total_score.clamp(0.0, 100.0),
        compactness_score,
        waste_score,
        cut_score,
        confidence: 0.0,
    }
}

/// Scores every candidate and stamps all of them with the confidence of the set.
pub fn score_all(
    results: &[OptimizationResult],
    context: OptimizationContext,
    config: &OptimizerConfig,
) -> Vec<QualityScore> {
    let mut scores: Vec<QualityScore> = results
        .iter()
        .map(|result| score(result, context, config))
        .collect();

    let totals: Vec<f64> = scores.iter().map(|s| s.total_score).collect();
    let confidence = confidence(&totals, &config.confidence);
    for s in &mut scores {
        s.confidence = confidence;
    }
    scores
}

/// Agreement of the candidate scores: `100 − penalty × stddev`, clamped to
/// 0..=100 and scaled down when fewer than `min_candidates` were feasible.
pub fn confidence(total_scores: &[f64], params: &ConfidenceParams) -> f64 {
    if total_scores.is_empty() {
        return 0.0;
    }

    let n = total_scores.len() as f64;
    let mean = total_scores.iter().sum::<f64>() / n;
    let variance = total_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let mut confidence = (100.0 - params.spread_penalty * variance.sqrt()).clamp(0.0, 100.0);

    if total_scores.len() < params.min_candidates {
        confidence *= n / params.min_candidates as f64;
    }
    confidence
}

pub fn confidence_level(confidence: f64, params: &ConfidenceParams) -> ConfidenceLevel {
    if confidence >= params.high_threshold {
        ConfidenceLevel::High
    } else if confidence >= params.medium_threshold {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Plate count against the area lower bound, blended with utilization.
fn compactness(result: &OptimizationResult) -> f64 {
    let plate_area = result.plates.first().map_or(0.0, |p| p.area());
    if plate_area <= 0.0 || result.total_plates == 0 {
        return 0.0;
    }

    let lower_bound = (result.used_area() / plate_area - EPSILON).ceil().max(1.0);
    let plate_score = (lower_bound / result.total_plates as f64 * 100.0).min(100.0);

    PLATE_COUNT_WEIGHT * plate_score + UTILIZATION_WEIGHT * result.average_utilization
}

/// Low waste, and whatever waste remains in reusable offcuts.
fn waste(result: &OptimizationResult) -> f64 {
    let total_area: f64 = result.plates.iter().map(|p| p.area()).sum();
    if total_area <= 0.0 {
        return 0.0;
    }

    let waste_percentage = result.total_waste / total_area * 100.0;
    let reusable_area: f64 = result
        .plates
        .iter()
        .flat_map(|p| &p.waste_areas)
        .filter(|w| w.reusable)
        .map(|w| w.area)
        .sum();
    let reusable_share = if result.total_waste > EPSILON {
        (reusable_area / result.total_waste * 100.0).min(100.0)
    } else {
        100.0
    };

    (WASTE_AMOUNT_WEIGHT * (100.0 - waste_percentage) + REUSABLE_SHARE_WEIGHT * reusable_share)
        .clamp(0.0, 100.0)
}

/// Pieces released per cut, capped at one.
fn cuts(result: &OptimizationResult) -> f64 {
    if result.total_guillotine_cuts == 0 {
        return 100.0;
    }
    let ratio = result.total_pieces() as f64 / result.total_guillotine_cuts as f64;
    100.0 * ratio.min(1.0)
}

impl Optimizer {
    pub(super) fn score_all(&self, results: &[OptimizationResult]) -> Vec<QualityScore> {
        score_all(results, self.request.options.context, &self.config)
    }

    /// Scores a plan that joined the candidate set late, reusing the set's confidence.
    pub(super) fn score_with_confidence(
        &self,
        result: &OptimizationResult,
        confidence: f64,
    ) -> QualityScore {
        QualityScore {
            confidence,
            ..score(result, self.request.options.context, &self.config)
        }
    }
}
