//! Shelf (strip) packing.
//!
//! Pieces are laid left to right along a shelf that shares a common top edge;
//! when the shelf is full a new one opens directly below, and when the plate
//! is full a new plate opens. Every shelf boundary is a full-width horizontal
//! cut and every piece boundary inside a shelf is a shelf-height vertical cut,
//! so the layout is guillotine-cuttable by construction.

use crate::geometry::{approx_eq, fits, EPSILON};
use crate::types::{
    OptimizerError, OversizedPiece, PieceInstance, PlacedPiece, PlateOptimization, Result,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which orientations the packer may try, and in which order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationPolicy {
    /// Requested orientation first, 90° rotation as fallback.
    Allowed,
    /// Requested orientation only.
    Disabled,
    /// Longer side horizontal first, the other orientation as fallback.
    PreferLandscape,
}

/// Candidate footprint of a piece: `(width, height, swapped)`.
type Orientation = (f64, f64, bool);

impl RotationPolicy {
    fn orientations(self, width: f64, height: f64) -> Vec<Orientation> {
        let requested = (width, height, false);
        let swapped = (height, width, true);
        if approx_eq(width, height) {
            return vec![requested];
        }
        match self {
            RotationPolicy::Disabled => vec![requested],
            RotationPolicy::Allowed => vec![requested, swapped],
            RotationPolicy::PreferLandscape if height > width => vec![swapped, requested],
            RotationPolicy::PreferLandscape => vec![requested, swapped],
        }
    }
}

/// A horizontal band of a plate holding one row of pieces.
#[derive(Debug, Clone)]
pub struct Shelf {
    pub y: f64,
    pub height: f64,
    /// Right edge of the rightmost piece.
    pub cursor_x: f64,
    /// Pieces ordered left to right.
    pub pieces: Vec<PlacedPiece>,
}

impl Shelf {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A plate under construction, kept as its shelf structure.
#[derive(Debug, Clone)]
pub struct PackedPlate {
    pub width: f64,
    pub height: f64,
    pub shelves: Vec<Shelf>,
}

impl PackedPlate {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
        }
    }

    /// Rebuilds the shelf structure of an already analyzed plate.
    pub fn from_plate(plate: &PlateOptimization) -> Self {
        Self {
            width: plate.width,
            height: plate.height,
            shelves: shelves_of(&plate.pieces),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    pub fn used_area(&self) -> f64 {
        self.pieces().map(PlacedPiece::area).sum()
    }

    pub fn piece_count(&self) -> usize {
        self.shelves.iter().map(|s| s.pieces.len()).sum()
    }

    /// Pieces in placement order: shelf by shelf, left to right.
    pub fn pieces(&self) -> impl Iterator<Item = &PlacedPiece> {
        self.shelves.iter().flat_map(|s| s.pieces.iter())
    }

    pub fn into_pieces(self) -> Vec<PlacedPiece> {
        self.shelves.into_iter().flat_map(|s| s.pieces).collect()
    }

    /// Bottom edge of the lowest shelf.
    fn shelves_bottom(&self) -> f64 {
        self.shelves.last().map_or(0.0, Shelf::bottom)
    }

    /// Tries the open (last) shelf, letting it grow downwards if needed.
    fn place_on_open_shelf(&mut self, piece: &PieceInstance, orientations: &[Orientation]) -> bool {
        let plate_height = self.height;
        let plate_width = self.width;
        let Some(shelf) = self.shelves.last_mut() else {
            return false;
        };

        for &(w, h, swapped) in orientations {
            if fits(shelf.cursor_x + w, shelf.y + h, plate_width, plate_height) {
                shelf.pieces.push(place(piece, shelf.cursor_x, shelf.y, w, h, swapped));
                shelf.cursor_x += w;
                shelf.height = shelf.height.max(h);
                return true;
            }
        }
        false
    }

    /// Opens a new shelf below the existing ones.
    fn place_on_new_shelf(&mut self, piece: &PieceInstance, orientations: &[Orientation]) -> bool {
        let y = self.shelves_bottom();
        for &(w, h, swapped) in orientations {
            if fits(w, y + h, self.width, self.height) {
                self.shelves.push(Shelf {
                    y,
                    height: h,
                    cursor_x: w,
                    pieces: vec![place(piece, 0.0, y, w, h, swapped)],
                });
                return true;
            }
        }
        false
    }

    /// Moves an already placed piece into a free shelf tail or a new shelf at the
    /// bottom, as long as the receiving leftover is at least `min_leftover_area`.
    /// Closed shelves never grow, so neighbouring shelves are left untouched.
    pub(crate) fn place_in_leftover(
        &mut self,
        piece: &PlacedPiece,
        allow_rotation: bool,
        min_leftover_area: f64,
    ) -> bool {
        let mut orientations = vec![(piece.width, piece.height, false)];
        if allow_rotation && !approx_eq(piece.width, piece.height) {
            orientations.push((piece.height, piece.width, true));
        }

        let plate_width = self.width;
        let plate_height = self.height;
        let last = self.shelves.len().saturating_sub(1);

        for (idx, shelf) in self.shelves.iter_mut().enumerate() {
            let tail_width = plate_width - shelf.cursor_x;
            if tail_width * shelf.height < min_leftover_area {
                continue;
            }
            let max_height = if idx == last {
                plate_height - shelf.y
            } else {
                shelf.height
            };

            for &(w, h, swapped) in &orientations {
                if fits(w, h, tail_width, max_height) {
                    shelf.pieces.push(relocate(piece, shelf.cursor_x, shelf.y, w, h, swapped));
                    shelf.cursor_x += w;
                    shelf.height = shelf.height.max(h);
                    return true;
                }
            }
        }

        let y = self.shelves_bottom();
        if plate_width * (plate_height - y) < min_leftover_area {
            return false;
        }
        for &(w, h, swapped) in &orientations {
            if fits(w, y + h, plate_width, plate_height) {
                self.shelves.push(Shelf {
                    y,
                    height: h,
                    cursor_x: w,
                    pieces: vec![relocate(piece, 0.0, y, w, h, swapped)],
                });
                return true;
            }
        }
        false
    }
}

fn place(piece: &PieceInstance, x: f64, y: f64, width: f64, height: f64, rotated: bool) -> PlacedPiece {
    PlacedPiece {
        id: piece.id.clone(),
        request_id: piece.request_id.clone(),
        x,
        y,
        width,
        height,
        rotated,
    }
}

fn relocate(piece: &PlacedPiece, x: f64, y: f64, width: f64, height: f64, swapped: bool) -> PlacedPiece {
    PlacedPiece {
        x,
        y,
        width,
        height,
        rotated: piece.rotated != swapped,
        ..piece.clone()
    }
}

/// Packs `pieces` in the given order onto as many `plate_width` × `plate_height`
/// plates as needed.
///
/// Fails with [`OptimizerError::PieceExceedsPlate`] when a piece cannot be placed
/// even on an empty plate under `rotation`.
pub fn pack(
    pieces: &[PieceInstance],
    plate_width: f64,
    plate_height: f64,
    rotation: RotationPolicy,
) -> Result<Vec<PackedPlate>> {
    let mut plates = Vec::new();
    let mut current = PackedPlate::new(plate_width, plate_height);

    for piece in pieces {
        let orientations = rotation.orientations(piece.width, piece.height);

        if current.place_on_open_shelf(piece, &orientations)
            || current.place_on_new_shelf(piece, &orientations)
        {
            continue;
        }

        if !current.is_empty() {
            plates.push(std::mem::replace(
                &mut current,
                PackedPlate::new(plate_width, plate_height),
            ));
            if current.place_on_new_shelf(piece, &orientations) {
                continue;
            }
        }

        return Err(OptimizerError::PieceExceedsPlate {
            plate_width,
            plate_height,
            pieces: vec![OversizedPiece {
                request_id: piece.request_id.clone(),
                width: piece.width,
                height: piece.height,
            }],
        });
    }

    if !current.is_empty() {
        plates.push(current);
    }

    Ok(plates)
}

/// Groups placements into shelves by their top edge, top to bottom.
/// A shelf is as tall as its tallest piece.
pub fn shelves_of(pieces: &[PlacedPiece]) -> Vec<Shelf> {
    let mut sorted: Vec<&PlacedPiece> = pieces.iter().collect();
    sorted.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut shelves: Vec<Shelf> = Vec::new();
    for piece in sorted {
        match shelves.last_mut() {
            Some(shelf) if (shelf.y - piece.y).abs() <= EPSILON => {
                shelf.height = shelf.height.max(piece.height);
                shelf.cursor_x = shelf.cursor_x.max(piece.right());
                shelf.pieces.push(piece.clone());
            }
            _ => shelves.push(Shelf {
                y: piece.y,
                height: piece.height,
                cursor_x: piece.right(),
                pieces: vec![piece.clone()],
            }),
        }
    }
    shelves
}
