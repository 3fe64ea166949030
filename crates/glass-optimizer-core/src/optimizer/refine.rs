use super::packer::{pack, PackedPlate};
use super::strategy::Strategy;
use super::Optimizer;
use crate::types::{OptimizationResult, PieceInstance, PlacedPiece, ProfileType, StrategyInfo};
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of the refinement pass.
pub(super) struct Refinement {
    /// Present only when the pass removed at least one plate.
    pub plan: Option<OptimizationResult>,
    pub iterations: usize,
}

impl Optimizer {
    /// Tries to empty the sparsest plates of `plan`, first by moving their pieces
    /// into reusable leftovers elsewhere, then by re-packing the two sparsest
    /// plates together. Bounded by the refinement budget; when the budget runs
    /// out the best layout found so far is kept.
    pub(super) fn refine(&self, plan: &OptimizationResult) -> Refinement {
        let budget = &self.config.refinement;
        let time_limit = Duration::from_millis(budget.time_limit_ms);
        let started = Instant::now();

        let mut plates: Vec<PackedPlate> = plan.plates.iter().map(PackedPlate::from_plate).collect();
        let mut iterations = 0;
        let mut improved = false;

        while plates.len() > 1 {
            if iterations >= budget.max_iterations || started.elapsed() >= time_limit {
                debug!(iterations, "refinement budget exhausted");
                break;
            }
            iterations += 1;

            match self
                .relocate_sparsest(&plates)
                .or_else(|| self.repack_sparsest_pair(&plates))
            {
                Some(next) => {
                    plates = next;
                    improved = true;
                }
                None => break,
            }
        }

        let plan = improved.then(|| {
            self.assemble(
                plates.into_iter().map(PackedPlate::into_pieces).collect(),
                StrategyInfo {
                    name: format!("{} + REFINED", plan.strategy.name),
                    description: format!(
                        "{} Sparse plates consolidated into reusable leftovers.",
                        plan.strategy.description
                    ),
                },
            )
        });

        Refinement { plan, iterations }
    }

    /// Moves every piece of the least used plate into reusable leftovers of the
    /// other plates. All or nothing.
    fn relocate_sparsest(&self, plates: &[PackedPlate]) -> Option<Vec<PackedPlate>> {
        let sparsest = sparsest_indices(plates).first().copied()?;

        let mut pieces: Vec<PlacedPiece> = plates[sparsest].pieces().cloned().collect();
        pieces.sort_by(|a, b| b.area().total_cmp(&a.area()));

        let mut others: Vec<PackedPlate> = plates
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != sparsest)
            .map(|(_, plate)| plate.clone())
            .collect();

        let allow_rotation = self.request.options.allow_rotation;
        let threshold = self.config.reusable_waste_threshold;
        for piece in &pieces {
            let placed = others
                .iter_mut()
                .any(|plate| plate.place_in_leftover(piece, allow_rotation, threshold));
            if !placed {
                return None;
            }
        }

        Some(others)
    }

    /// Re-packs the pieces of the two least used plates under every strategy and
    /// keeps the first layout that needs a single plate.
    fn repack_sparsest_pair(&self, plates: &[PackedPlate]) -> Option<Vec<PackedPlate>> {
        let sparsest = sparsest_indices(plates);
        let (first, second) = match sparsest.as_slice() {
            [a, b, ..] => (*a, *b),
            _ => return None,
        };

        let pieces: Vec<PieceInstance> = [first, second]
            .iter()
            .flat_map(|&idx| plates[idx].pieces())
            .map(requested_orientation)
            .collect();

        let strategies =
            Strategy::for_profile(ProfileType::Mixed, self.request.options.allow_rotation);
        for strategy in &strategies {
            let Ok(packed) = pack(
                &strategy.order(&pieces),
                self.request.plate_width,
                self.request.plate_height,
                strategy.rotation,
            ) else {
                continue;
            };

            if packed.len() == 1 {
                let mut next: Vec<PackedPlate> = plates
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != first && *idx != second)
                    .map(|(_, plate)| plate.clone())
                    .collect();
                next.extend(packed);
                return Some(next);
            }
        }

        None
    }
}

/// Plate indices ordered by used area, least used first.
fn sparsest_indices(plates: &[PackedPlate]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..plates.len()).collect();
    order.sort_by(|&a, &b| plates[a].used_area().total_cmp(&plates[b].used_area()));
    order
}

/// Turns a placement back into a piece in its requested orientation.
fn requested_orientation(piece: &PlacedPiece) -> PieceInstance {
    let (width, height) = if piece.rotated {
        (piece.height, piece.width)
    } else {
        (piece.width, piece.height)
    };
    PieceInstance {
        id: piece.id.clone(),
        request_id: piece.request_id.clone(),
        width,
        height,
    }
}
