//! Display orientation: which plate corner the operator treats as the origin.
//!
//! Plans are always computed with the origin at the top-left corner. These
//! transforms only produce mirrored copies for display and printing.

use crate::optimizer::describe_cut;
use crate::types::{CutInstruction, CutType, OptimizationResult, PlateOptimization};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlateOrientation {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl PlateOrientation {
    pub const ALL: [PlateOrientation; 4] = [
        PlateOrientation::TopLeft,
        PlateOrientation::TopRight,
        PlateOrientation::BottomLeft,
        PlateOrientation::BottomRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlateOrientation::TopLeft => "Top left",
            PlateOrientation::TopRight => "Top right",
            PlateOrientation::BottomLeft => "Bottom left",
            PlateOrientation::BottomRight => "Bottom right",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PlateOrientation::TopLeft => "Measure from the top-left corner (standard layout)",
            PlateOrientation::TopRight => "Measure from the top-right corner; the layout is mirrored left to right",
            PlateOrientation::BottomLeft => "Measure from the bottom-left corner; the layout is mirrored top to bottom",
            PlateOrientation::BottomRight => "Measure from the bottom-right corner; the layout is rotated half a turn",
        }
    }

    fn mirrors_x(self) -> bool {
        matches!(self, PlateOrientation::TopRight | PlateOrientation::BottomRight)
    }

    fn mirrors_y(self) -> bool {
        matches!(self, PlateOrientation::BottomLeft | PlateOrientation::BottomRight)
    }
}

impl fmt::Display for PlateOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlateOrientation::TopLeft => "TOP_LEFT",
            PlateOrientation::TopRight => "TOP_RIGHT",
            PlateOrientation::BottomLeft => "BOTTOM_LEFT",
            PlateOrientation::BottomRight => "BOTTOM_RIGHT",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for PlateOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        PlateOrientation::ALL
            .into_iter()
            .find(|o| o.to_string() == normalized)
            .ok_or_else(|| format!("unknown plate orientation '{}'", s))
    }
}

/// Mirrors `start..end` inside `0..extent`.
fn mirror_span(start: f64, end: f64, extent: f64) -> (f64, f64) {
    (extent - end, extent - start)
}

/// Copy of `plate` with pieces and waste areas expressed from `orientation`'s corner.
pub fn transform_plate(plate: &PlateOptimization, orientation: PlateOrientation) -> PlateOptimization {
    let mut out = plate.clone();

    if orientation.mirrors_x() {
        for piece in &mut out.pieces {
            piece.x = plate.width - piece.x - piece.width;
        }
        for waste in &mut out.waste_areas {
            waste.x = plate.width - waste.x - waste.width;
        }
    }
    if orientation.mirrors_y() {
        for piece in &mut out.pieces {
            piece.y = plate.height - piece.y - piece.height;
        }
        for waste in &mut out.waste_areas {
            waste.y = plate.height - waste.y - waste.height;
        }
    }

    out
}

fn transform_instruction(
    cut: &CutInstruction,
    width: f64,
    height: f64,
    orientation: PlateOrientation,
) -> CutInstruction {
    let mut out = cut.clone();
    match cut.cut_type {
        CutType::Horizontal => {
            if orientation.mirrors_y() {
                out.position = height - cut.position;
            }
            if orientation.mirrors_x() {
                (out.start, out.end) = mirror_span(cut.start, cut.end, width);
            }
        }
        CutType::Vertical => {
            if orientation.mirrors_x() {
                out.position = width - cut.position;
            }
            if orientation.mirrors_y() {
                (out.start, out.end) = mirror_span(cut.start, cut.end, height);
            }
        }
    }
    out.description = describe_cut(out.cut_type, out.plate_number, out.position, out.start, out.end);
    out
}

/// Copy of `result` with every plate and cut expressed from `orientation`'s corner.
pub fn transform_result(result: &OptimizationResult, orientation: PlateOrientation) -> OptimizationResult {
    if orientation == PlateOrientation::TopLeft {
        return result.clone();
    }

    let mut out = result.clone();
    out.plates = result
        .plates
        .iter()
        .map(|plate| transform_plate(plate, orientation))
        .collect();
    out.instructions = result
        .instructions
        .iter()
        .map(|cut| {
            let (width, height) = result
                .plates
                .iter()
                .find(|p| p.plate_number == cut.plate_number)
                .map_or((0.0, 0.0), |p| (p.width, p.height));
            transform_instruction(cut, width, height, orientation)
        })
        .collect();

    if let Some(largest) = out.waste_quality.largest_waste_piece.as_mut() {
        if let Some(plate) = result.plates.iter().find(|p| p.plate_number == largest.plate_number) {
            if orientation.mirrors_x() {
                largest.x = plate.width - largest.x - largest.width;
            }
            if orientation.mirrors_y() {
                largest.y = plate.height - largest.y - largest.height;
            }
        }
    }

    out
}
