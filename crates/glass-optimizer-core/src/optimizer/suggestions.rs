use super::packer::{pack, RotationPolicy};
use super::strategy::{PieceOrdering, Strategy};
use super::Optimizer;
use crate::geometry::{approx_eq, EPSILON};
use crate::types::{
    EnhancedOptimizationResult, OptimizationContext, OptimizationResult, PieceInstance,
    Suggestion, SuggestionKind,
};

impl Optimizer {
    /// Non-binding advice derived from the primary plan and its alternatives.
    pub(super) fn suggest(
        &self,
        pieces: &[PieceInstance],
        primary: &OptimizationResult,
        alternatives: &[OptimizationResult],
    ) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();
        if primary.is_empty() {
            return suggestions;
        }

        if let Some(s) = self.rotation_suggestion(pieces, primary) {
            suggestions.push(s);
        }

        if let Some(last) = primary.plates.last().filter(|_| primary.plates.len() > 1) {
            if last.utilization < self.config.sparse_plate_warning {
                suggestions.push(Suggestion {
                    kind: SuggestionKind::Consolidation,
                    description: format!(
                        "Plate {} is only {:.1}% used; add pieces from another job or move these {} piece(s) to the next order",
                        last.plate_number,
                        last.utilization,
                        last.pieces.len()
                    ),
                });
            }
        }

        if let Some(largest) = &primary.waste_quality.largest_waste_piece {
            suggestions.push(Suggestion {
                kind: SuggestionKind::WasteReuse,
                description: format!(
                    "Keep the {:.1} × {:.1} cm offcut from plate {} for later jobs ({} reusable offcut(s) in total)",
                    largest.width,
                    largest.height,
                    largest.plate_number,
                    primary.waste_quality.reusable_waste_pieces
                ),
            });
        }

        if let Some(s) = self.context_suggestion(primary, alternatives) {
            suggestions.push(s);
        }

        if let Some(s) = plate_size_suggestion(primary, self.config.low_utilization_warning) {
            suggestions.push(s);
        }

        suggestions
    }

    /// When rotation is disabled, checks whether turning pieces would save plates.
    fn rotation_suggestion(
        &self,
        pieces: &[PieceInstance],
        primary: &OptimizationResult,
    ) -> Option<Suggestion> {
        if self.request.options.allow_rotation
            || pieces.iter().all(|p| approx_eq(p.width, p.height))
        {
            return None;
        }

        let strategy = Strategy::new(PieceOrdering::ByHeightDesc, RotationPolicy::Allowed);
        let rotated = pack(
            &strategy.order(pieces),
            self.request.plate_width,
            self.request.plate_height,
            strategy.rotation,
        )
        .ok()?;

        let saved = (primary.total_plates as usize).checked_sub(rotated.len())?;
        (saved > 0).then(|| Suggestion {
            kind: SuggestionKind::Rotation,
            description: format!(
                "Allowing pieces to be rotated 90° could save {} plate(s) ({} instead of {})",
                saved,
                rotated.len(),
                primary.total_plates
            ),
        })
    }

    /// Points at an alternative that a different context would have preferred.
    fn context_suggestion(
        &self,
        primary: &OptimizationResult,
        alternatives: &[OptimizationResult],
    ) -> Option<Suggestion> {
        let context = self.request.options.context;

        if context != OptimizationContext::ExpensiveMaterial {
            if let Some(fewer) = alternatives
                .iter()
                .find(|alt| alt.total_plates < primary.total_plates)
            {
                return Some(Suggestion {
                    kind: SuggestionKind::Context,
                    description: format!(
                        "{} needs {} plate(s) instead of {}; the {} context ranks it first",
                        fewer.strategy.name,
                        fewer.total_plates,
                        primary.total_plates,
                        OptimizationContext::ExpensiveMaterial
                    ),
                });
            }
        }

        if context != OptimizationContext::QuickCut {
            if let Some(faster) = alternatives.iter().find(|alt| {
                alt.total_plates == primary.total_plates
                    && alt.total_guillotine_cuts < primary.total_guillotine_cuts
            }) {
                return Some(Suggestion {
                    kind: SuggestionKind::Context,
                    description: format!(
                        "{} needs {} cuts instead of {} on the same plates; the {} context ranks it first",
                        faster.strategy.name,
                        faster.total_guillotine_cuts,
                        primary.total_guillotine_cuts,
                        OptimizationContext::QuickCut
                    ),
                });
            }
        }

        None
    }
}

/// A single, poorly used plate may be replaced by a smaller stock size.
fn plate_size_suggestion(primary: &OptimizationResult, threshold: f64) -> Option<Suggestion> {
    let [plate] = primary.plates.as_slice() else {
        return None;
    };
    if plate.utilization >= threshold {
        return None;
    }

    let used_width = plate.pieces.iter().map(|p| p.right()).fold(0.0, f64::max);
    let used_height = plate.pieces.iter().map(|p| p.bottom()).fold(0.0, f64::max);
    if used_width >= plate.width - EPSILON && used_height >= plate.height - EPSILON {
        return None;
    }

    Some(Suggestion {
        kind: SuggestionKind::PlateSize,
        description: format!(
            "All pieces fit within {:.1} × {:.1} cm; a smaller plate than {:.1} × {:.1} cm would cut waste",
            used_width, used_height, plate.width, plate.height
        ),
    })
}

/// Human-readable summary lines for a finished optimization.
pub fn insights(result: &EnhancedOptimizationResult) -> Vec<String> {
    let primary = &result.primary;
    if primary.is_empty() {
        return vec!["No feasible cutting plan was found".to_string()];
    }

    let mut lines = vec![
        format!(
            "{} plate(s) at {:.1}% average utilization with {} guillotine cuts",
            primary.total_plates, primary.average_utilization, primary.total_guillotine_cuts
        ),
        format!(
            "Best strategy: {} (score {:.1}/100 for {})",
            primary.strategy.name, result.primary_score.total_score, result.metadata.context
        ),
        format!(
            "Request profile: {} with {} piece(s)",
            result.profile.profile_type, result.profile.piece_count
        ),
        format!(
            "Confidence: {} ({:.0}%), {} of {} strategies feasible",
            result.metadata.confidence_level,
            result.primary_score.confidence,
            result.metadata.feasible_strategies,
            result.metadata.strategies_evaluated
        ),
    ];

    let plate_area = primary.plates[0].area();
    if plate_area > 0.0 {
        let lower_bound = (primary.used_area() / plate_area - EPSILON).ceil().max(1.0) as u32;
        if lower_bound == primary.total_plates {
            lines.push("Plate count matches the area lower bound".to_string());
        } else {
            lines.push(format!(
                "Area lower bound is {} plate(s); this plan uses {}",
                lower_bound, primary.total_plates
            ));
        }
    }

    if primary.waste_quality.reusable_waste_pieces > 0 {
        lines.push(format!(
            "{} reusable offcut(s) left over",
            primary.waste_quality.reusable_waste_pieces
        ));
    }
    if result.metadata.refinement_applied {
        lines.push("Refinement removed at least one plate".to_string());
    }
    if !result.alternatives.is_empty() {
        lines.push(format!("{} alternative plan(s) available", result.alternatives.len()));
    }
    if !result.validation.is_valid {
        lines.push(format!(
            "Validation found {} problem(s)",
            result.validation.errors.len()
        ));
    }

    lines
}
