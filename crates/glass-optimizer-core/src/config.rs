use crate::types::OptimizationContext;
use serde::{Deserialize, Serialize};

/// Tunable thresholds and weights. Every field has a default, so a config file
/// only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerConfig {
    /// Minimum area (cm²) for a leftover to count as a reusable offcut.
    pub reusable_waste_threshold: f64,
    /// Average utilization (%) below which the validator emits a warning.
    pub low_utilization_warning: f64,
    /// Utilization (%) below which the last plate is reported as nearly empty.
    pub sparse_plate_warning: f64,
    /// Rounding step (percentage points) used when deduplicating plans.
    pub dedupe_utilization_step: f64,
    pub weights: ContextWeightTable,
    pub profile: ProfileThresholds,
    pub confidence: ConfidenceParams,
    pub refinement: RefinementBudget,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            reusable_waste_threshold: 2000.0,
            low_utilization_warning: 60.0,
            sparse_plate_warning: 30.0,
            dedupe_utilization_step: 0.1,
            weights: ContextWeightTable::default(),
            profile: ProfileThresholds::default(),
            confidence: ConfidenceParams::default(),
            refinement: RefinementBudget::default(),
        }
    }
}

/// Relative weight of each score component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWeights {
    pub compactness: f64,
    pub waste: f64,
    pub cut: f64,
}

impl ContextWeights {
    pub const fn new(compactness: f64, waste: f64, cut: f64) -> Self {
        Self {
            compactness,
            waste,
            cut,
        }
    }

    pub fn sum(&self) -> f64 {
        self.compactness + self.waste + self.cut
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextWeightTable {
    pub production: ContextWeights,
    pub expensive_material: ContextWeights,
    pub quick_cut: ContextWeights,
    pub balanced: ContextWeights,
}

impl Default for ContextWeightTable {
    fn default() -> Self {
        Self {
            production: ContextWeights::new(0.45, 0.15, 0.40),
            expensive_material: ContextWeights::new(0.30, 0.60, 0.10),
            quick_cut: ContextWeights::new(0.25, 0.15, 0.60),
            balanced: ContextWeights::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
        }
    }
}

impl ContextWeightTable {
    pub fn for_context(&self, context: OptimizationContext) -> ContextWeights {
        match context {
            OptimizationContext::Production => self.production,
            OptimizationContext::ExpensiveMaterial => self.expensive_material,
            OptimizationContext::QuickCut => self.quick_cut,
            OptimizationContext::Balanced => self.balanced,
        }
    }
}

/// Thresholds used to classify the request profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileThresholds {
    /// Maximum coefficient of variation of piece areas for `UNIFORM`.
    pub uniform_variation: f64,
    pub many_small_min_count: usize,
    /// Median piece area as a fraction of the plate area.
    pub many_small_area_ratio: f64,
    pub few_large_max_count: usize,
    pub few_large_area_ratio: f64,
    /// Fraction of the pieces (largest first) inspected for `LARGE_DOMINANT`.
    pub dominant_piece_share: f64,
    /// Share of the total area those pieces must cover.
    pub dominant_area_share: f64,
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            uniform_variation: 0.15,
            many_small_min_count: 20,
            many_small_area_ratio: 0.05,
            few_large_max_count: 5,
            few_large_area_ratio: 0.25,
            dominant_piece_share: 0.2,
            dominant_area_share: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfidenceParams {
    /// Confidence points lost per point of score standard deviation.
    pub spread_penalty: f64,
    /// Below this many feasible plans confidence is scaled down proportionally.
    pub min_candidates: usize,
    pub high_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self {
            spread_penalty: 2.0,
            min_candidates: 3,
            high_threshold: 75.0,
            medium_threshold: 50.0,
        }
    }
}

/// Bounds the refinement pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefinementBudget {
    pub max_iterations: usize,
    pub time_limit_ms: u64,
}

impl Default for RefinementBudget {
    fn default() -> Self {
        Self {
            max_iterations: 32,
            time_limit_ms: 250,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"reusableWasteThreshold": 1500.0}"#).unwrap();
        assert_eq!(config.reusable_waste_threshold, 1500.0);
        assert_eq!(config.low_utilization_warning, 60.0);
        assert_eq!(config.refinement.max_iterations, 32);
    }

    #[test]
    fn test_balanced_weights_are_even() {
        let weights = ContextWeightTable::default().for_context(OptimizationContext::Balanced);
        assert!((weights.compactness - weights.waste).abs() < 1e-12);
        assert!((weights.waste - weights.cut).abs() < 1e-12);
        assert!((weights.sum() - 1.0).abs() < 1e-12);
    }
}
