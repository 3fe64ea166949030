use super::Optimizer;
use crate::geometry::{approx_eq, Rect, EPSILON};
use crate::types::{
    CutInstruction, CutType, OptimizationResult, OptimizerError, PlateOptimization,
    ValidationReport,
};
use std::collections::HashMap;

/// Re-checks the tiling invariant of one plate: every piece and waste area lies
/// on the plate, nothing overlaps, and together they cover the plate area.
pub fn check_plate(plate: &PlateOptimization) -> Vec<OptimizerError> {
    let violation = |detail: String| OptimizerError::TilingInvariantViolation {
        plate_number: plate.plate_number,
        detail,
    };

    let bounds = Rect::new(0.0, 0.0, plate.width, plate.height);
    let mut errors = Vec::new();

    let mut rects: Vec<(String, Rect)> = plate
        .pieces
        .iter()
        .map(|p| (format!("piece '{}'", p.id), p.rect()))
        .collect();
    rects.extend(
        plate
            .waste_areas
            .iter()
            .map(|w| (format!("waste at ({}, {})", w.x, w.y), w.rect())),
    );

    for (label, rect) in &rects {
        if !bounds.contains(rect) {
            errors.push(violation(format!("{} lies outside the plate", label)));
        }
    }

    for (i, (label_a, a)) in rects.iter().enumerate() {
        for (label_b, b) in &rects[i + 1..] {
            if a.overlaps(b) {
                errors.push(violation(format!("{} overlaps {}", label_a, label_b)));
            }
        }
    }

    let covered: f64 = rects.iter().map(|(_, r)| r.area()).sum();
    let tolerance = (plate.area() * 1e-9).max(EPSILON);
    if (covered - plate.area()).abs() > tolerance {
        errors.push(violation(format!(
            "pieces and waste cover {:.2} cm² of a {:.2} cm² plate",
            covered,
            plate.area()
        )));
    }

    errors
}

/// Replays `cuts` on `plate`: each cut must split exactly one existing
/// rectangle edge to edge, and afterwards every piece must be a rectangle of
/// its own.
pub fn replay_cuts<'a>(
    plate: &PlateOptimization,
    cuts: impl IntoIterator<Item = &'a CutInstruction>,
) -> std::result::Result<(), String> {
    let mut regions = vec![Rect::new(0.0, 0.0, plate.width, plate.height)];

    for cut in cuts {
        let hit = regions.iter().position(|r| match cut.cut_type {
            CutType::Horizontal => {
                approx_eq(r.x, cut.start)
                    && approx_eq(r.right(), cut.end)
                    && cut.position > r.y + EPSILON
                    && cut.position < r.bottom() - EPSILON
            }
            CutType::Vertical => {
                approx_eq(r.y, cut.start)
                    && approx_eq(r.bottom(), cut.end)
                    && cut.position > r.x + EPSILON
                    && cut.position < r.right() - EPSILON
            }
        });

        let Some(idx) = hit else {
            return Err(format!(
                "step {} does not run edge to edge through any remaining piece of glass",
                cut.step
            ));
        };

        let region = regions.swap_remove(idx);
        let (first, second) = match cut.cut_type {
            CutType::Horizontal => (
                Rect::new(region.x, region.y, region.width, cut.position - region.y),
                Rect::new(region.x, cut.position, region.width, region.bottom() - cut.position),
            ),
            CutType::Vertical => (
                Rect::new(region.x, region.y, cut.position - region.x, region.height),
                Rect::new(cut.position, region.y, region.right() - cut.position, region.height),
            ),
        };
        regions.push(first);
        regions.push(second);
    }

    for piece in &plate.pieces {
        if !regions.iter().any(|r| r.approx_eq(&piece.rect())) {
            return Err(format!("piece '{}' is not released by the cut sequence", piece.id));
        }
    }

    Ok(())
}

impl Optimizer {
    /// Re-verifies a finished plan. Hard violations land in `errors`, soft
    /// concerns in `warnings`.
    pub(super) fn validate(&self, plan: &OptimizationResult) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if plan.total_plates as usize != plan.plates.len() {
            errors.push(format!(
                "totalPlates is {} but the plan holds {} plates",
                plan.total_plates,
                plan.plates.len()
            ));
        }
        if plan.total_guillotine_cuts as usize != plan.instructions.len() {
            errors.push(format!(
                "totalGuillotineCuts is {} but {} instructions were generated",
                plan.total_guillotine_cuts,
                plan.instructions.len()
            ));
        }

        self.check_conservation(plan, &mut errors);
        self.check_rotation(plan, &mut errors);

        for plate in &plan.plates {
            errors.extend(check_plate(plate).iter().map(ToString::to_string));

            let cuts = plan
                .instructions
                .iter()
                .filter(|cut| cut.plate_number == plate.plate_number);
            if let Err(detail) = replay_cuts(plate, cuts) {
                errors.push(
                    OptimizerError::TilingInvariantViolation {
                        plate_number: plate.plate_number,
                        detail,
                    }
                    .to_string(),
                );
            }
        }

        if plan.average_utilization < self.config.low_utilization_warning {
            warnings.push(format!(
                "Average utilization is {:.1}%, below {:.0}%",
                plan.average_utilization, self.config.low_utilization_warning
            ));
        }
        if let Some(last) = plan.plates.last().filter(|_| plan.plates.len() > 1) {
            if last.utilization < self.config.sparse_plate_warning {
                warnings.push(format!(
                    "Plate {} is nearly empty ({:.1}% used)",
                    last.plate_number, last.utilization
                ));
            }
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Every requested piece appears exactly once.
    fn check_conservation(&self, plan: &OptimizationResult, errors: &mut Vec<String>) {
        let mut placed: HashMap<&str, u32> = HashMap::new();
        let mut ids: HashMap<&str, u32> = HashMap::new();
        for piece in plan.plates.iter().flat_map(|p| &p.pieces) {
            *placed.entry(piece.request_id.as_str()).or_default() += 1;
            *ids.entry(piece.id.as_str()).or_default() += 1;
        }

        for cut in &self.request.cuts {
            let count = placed.remove(cut.id.as_str()).unwrap_or(0);
            if count != cut.quantity {
                errors.push(format!(
                    "Cut '{}' requested {} times but placed {} times",
                    cut.id, cut.quantity, count
                ));
            }
        }
        for request_id in placed.keys() {
            errors.push(format!("Placed piece references unknown cut '{}'", request_id));
        }

        let mut duplicates: Vec<&str> = ids
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id)
            .collect();
        duplicates.sort_unstable();
        for id in duplicates {
            errors.push(format!("Piece '{}' is placed more than once", id));
        }
    }

    /// Placed dimensions match the request, swapped exactly when `rotated`.
    fn check_rotation(&self, plan: &OptimizationResult, errors: &mut Vec<String>) {
        let requests: HashMap<&str, (f64, f64)> = self
            .request
            .cuts
            .iter()
            .map(|c| (c.id.as_str(), (c.width, c.height)))
            .collect();

        for piece in plan.plates.iter().flat_map(|p| &p.pieces) {
            let Some(&(width, height)) = requests.get(piece.request_id.as_str()) else {
                continue;
            };
            let (expected_w, expected_h) = if piece.rotated {
                (height, width)
            } else {
                (width, height)
            };
            if !approx_eq(piece.width, expected_w) || !approx_eq(piece.height, expected_h) {
                errors.push(format!(
                    "Piece '{}' is {} × {} cm, expected {} × {} cm",
                    piece.id, piece.width, piece.height, expected_w, expected_h
                ));
            }
            if piece.rotated && !self.request.options.allow_rotation {
                errors.push(format!(
                    "Piece '{}' was rotated although rotation is disabled",
                    piece.id
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlacedPiece, WasteArea};

    fn piece(id: &str, x: f64, y: f64, w: f64, h: f64) -> PlacedPiece {
        PlacedPiece {
            id: id.to_string(),
            request_id: id.to_string(),
            x,
            y,
            width: w,
            height: h,
            rotated: false,
        }
    }

    fn plate(pieces: Vec<PlacedPiece>, waste_areas: Vec<WasteArea>) -> PlateOptimization {
        PlateOptimization {
            plate_number: 1,
            width: 100.0,
            height: 100.0,
            pieces,
            waste_areas,
            utilization: 0.0,
            waste_percentage: 0.0,
        }
    }

    fn cut(step: u32, cut_type: CutType, position: f64, start: f64, end: f64) -> CutInstruction {
        CutInstruction {
            step,
            plate_number: 1,
            cut_type,
            position,
            start,
            end,
            description: String::new(),
            resulting_pieces: Vec::new(),
        }
    }

    #[test]
    fn test_overlap_is_reported() {
        let plate = plate(
            vec![
                piece("a", 0.0, 0.0, 60.0, 100.0),
                piece("b", 50.0, 0.0, 50.0, 100.0),
            ],
            Vec::new(),
        );
        let errors = check_plate(&plate);
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("overlaps")));
    }

    #[test]
    fn test_uncovered_area_is_reported() {
        let plate = plate(vec![piece("a", 0.0, 0.0, 50.0, 100.0)], Vec::new());
        let errors = check_plate(&plate);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            OptimizerError::TilingInvariantViolation { plate_number: 1, .. }
        ));
    }

    #[test]
    fn test_replay_accepts_guillotine_sequence() {
        let plate = plate(
            vec![
                piece("a", 0.0, 0.0, 50.0, 50.0),
                piece("b", 50.0, 0.0, 50.0, 50.0),
            ],
            Vec::new(),
        );
        let cuts = [
            cut(1, CutType::Horizontal, 50.0, 0.0, 100.0),
            cut(2, CutType::Vertical, 50.0, 0.0, 50.0),
        ];
        assert!(replay_cuts(&plate, &cuts).is_ok());
    }

    #[test]
    fn test_replay_rejects_cut_through_nothing() {
        let plate = plate(vec![piece("a", 0.0, 0.0, 50.0, 50.0)], Vec::new());
        // Only half the plate height: the shelf was never separated.
        let cuts = [cut(1, CutType::Vertical, 50.0, 0.0, 50.0)];
        let err = replay_cuts(&plate, &cuts).unwrap_err();
        assert!(err.contains("step 1"));
    }

    #[test]
    fn test_replay_requires_every_piece_released() {
        let plate = plate(
            vec![
                piece("a", 0.0, 0.0, 50.0, 100.0),
                piece("b", 50.0, 0.0, 50.0, 100.0),
            ],
            Vec::new(),
        );
        let err = replay_cuts(&plate, std::iter::empty()).unwrap_err();
        assert!(err.contains("piece 'a'"));
    }
}
