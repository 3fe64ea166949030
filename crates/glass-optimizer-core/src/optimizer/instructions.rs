use super::packer::shelves_of;
use crate::geometry::{approx_eq, EPSILON};
use crate::types::{CutInstruction, CutType, PlateOptimization, ResultingPiece};

struct PendingCut {
    cut_type: CutType,
    position: f64,
    start: f64,
    end: f64,
}

/// Turns a plate's shelf layout into an ordered list of guillotine cuts.
///
/// Shelves are processed top to bottom. For each shelf the full-width
/// horizontal cut along its bottom edge comes first, then one vertical cut per
/// piece boundary spanning the shelf, then a horizontal trim under every piece
/// shorter than its shelf. Each cut only ever splits a rectangle that exists
/// after the earlier cuts. Steps start at 1 for the plate.
pub fn instructions(plate: &PlateOptimization) -> Vec<CutInstruction> {
    let mut cuts: Vec<PendingCut> = Vec::new();
    // Step that frees each piece, 0 when the piece is the whole plate.
    let mut released_at = vec![0usize; plate.pieces.len()];

    let mut last_cut_y = 0.0;
    let mut last_cut_step = 0;

    for shelf in shelves_of(&plate.pieces) {
        let top_step = if shelf.y > last_cut_y + EPSILON {
            cuts.push(PendingCut {
                cut_type: CutType::Horizontal,
                position: shelf.y,
                start: 0.0,
                end: plate.width,
            });
            cuts.len()
        } else {
            last_cut_step
        };

        let bottom_step = if shelf.bottom() < plate.height - EPSILON {
            cuts.push(PendingCut {
                cut_type: CutType::Horizontal,
                position: shelf.bottom(),
                start: 0.0,
                end: plate.width,
            });
            cuts.len()
        } else {
            0
        };
        last_cut_y = shelf.bottom();
        last_cut_step = bottom_step;

        let mut boundaries: Vec<f64> = shelf
            .pieces
            .iter()
            .flat_map(|p| [p.x, p.right()])
            .filter(|&x| x > EPSILON && x < plate.width - EPSILON)
            .collect();
        boundaries.sort_by(|a, b| a.total_cmp(b));
        boundaries.dedup_by(|a, b| approx_eq(*a, *b));

        let boundary_steps: Vec<(f64, usize)> = boundaries
            .into_iter()
            .map(|x| {
                cuts.push(PendingCut {
                    cut_type: CutType::Vertical,
                    position: x,
                    start: shelf.y,
                    end: shelf.bottom(),
                });
                (x, cuts.len())
            })
            .collect();
        let step_at = |x: f64| {
            boundary_steps
                .iter()
                .find(|(b, _)| approx_eq(*b, x))
                .map_or(0, |&(_, step)| step)
        };

        for piece in &shelf.pieces {
            let bottom = if piece.height < shelf.height - EPSILON {
                cuts.push(PendingCut {
                    cut_type: CutType::Horizontal,
                    position: piece.bottom(),
                    start: piece.x,
                    end: piece.right(),
                });
                cuts.len()
            } else {
                bottom_step
            };

            // Pieces of a valid tiling never share a top-left corner.
            if let Some(idx) = plate
                .pieces
                .iter()
                .position(|p| approx_eq(p.x, piece.x) && approx_eq(p.y, piece.y))
            {
                released_at[idx] = top_step
                    .max(bottom)
                    .max(step_at(piece.x))
                    .max(step_at(piece.right()));
            }
        }
    }

    cuts.into_iter()
        .enumerate()
        .map(|(idx, cut)| {
            let step = idx + 1;
            let resulting_pieces = plate
                .pieces
                .iter()
                .enumerate()
                .filter(|(i, _)| released_at[*i] == step)
                .map(|(i, p)| ResultingPiece {
                    piece_number: i as u32 + 1,
                    piece_id: p.id.clone(),
                    width: p.width,
                    height: p.height,
                })
                .collect();

            CutInstruction {
                step: step as u32,
                plate_number: plate.plate_number,
                cut_type: cut.cut_type,
                position: cut.position,
                start: cut.start,
                end: cut.end,
                description: describe(
                    cut.cut_type,
                    plate.plate_number,
                    cut.position,
                    cut.start,
                    cut.end,
                ),
                resulting_pieces,
            }
        })
        .collect()
}

pub(crate) fn describe(
    cut_type: CutType,
    plate_number: u32,
    position: f64,
    start: f64,
    end: f64,
) -> String {
    match cut_type {
        CutType::Horizontal => format!(
            "Plate {}: horizontal cut at y = {:.1} cm, from x = {:.1} to {:.1} cm",
            plate_number, position, start, end
        ),
        CutType::Vertical => format!(
            "Plate {}: vertical cut at x = {:.1} cm, from y = {:.1} to {:.1} cm",
            plate_number, position, start, end
        ),
    }
}
