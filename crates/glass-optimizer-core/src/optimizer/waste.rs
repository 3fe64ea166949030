use super::packer::shelves_of;
use crate::geometry::{Rect, EPSILON};
use crate::types::{PlacedPiece, PlateOptimization, WasteArea, WastePiece, WasteQuality};

/// Leftover rectangles and coverage figures for one plate.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteAnalysis {
    pub waste_areas: Vec<WasteArea>,
    pub utilization: f64,
    pub waste_percentage: f64,
}

/// Derives the empty rectangles left by the shelf structure of `pieces`:
/// cells below pieces shorter than their shelf, gaps and tails inside each
/// shelf, bands between shelves and the remainder below the last shelf.
/// Together with the pieces they tile the plate exactly.
pub fn analyze(
    plate_width: f64,
    plate_height: f64,
    pieces: &[PlacedPiece],
    reusable_threshold: f64,
) -> WasteAnalysis {
    let mut rects = Vec::new();
    let mut cursor_y = 0.0;

    for shelf in shelves_of(pieces) {
        if shelf.y > cursor_y + EPSILON {
            rects.push(Rect::new(0.0, cursor_y, plate_width, shelf.y - cursor_y));
        }

        let mut cursor_x = 0.0;
        for piece in &shelf.pieces {
            if piece.x > cursor_x + EPSILON {
                rects.push(Rect::new(cursor_x, shelf.y, piece.x - cursor_x, shelf.height));
            }
            if piece.height < shelf.height - EPSILON {
                rects.push(Rect::new(
                    piece.x,
                    piece.bottom(),
                    piece.width,
                    shelf.height - piece.height,
                ));
            }
            cursor_x = piece.right();
        }

        if cursor_x < plate_width - EPSILON {
            rects.push(Rect::new(cursor_x, shelf.y, plate_width - cursor_x, shelf.height));
        }
        cursor_y = shelf.bottom();
    }

    if cursor_y < plate_height - EPSILON {
        rects.push(Rect::new(0.0, cursor_y, plate_width, plate_height - cursor_y));
    }

    let waste_areas = rects
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(|r| WasteArea {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            area: r.area(),
            reusable: r.area() >= reusable_threshold,
        })
        .collect();

    let plate_area = plate_width * plate_height;
    let used: f64 = pieces.iter().map(PlacedPiece::area).sum();
    let utilization = if plate_area > 0.0 {
        used / plate_area * 100.0
    } else {
        0.0
    };

    WasteAnalysis {
        waste_areas,
        utilization,
        waste_percentage: 100.0 - utilization,
    }
}

/// Counts reusable offcuts across a plan and finds the largest one.
pub fn waste_quality(plates: &[PlateOptimization]) -> WasteQuality {
    let mut reusable_waste_pieces = 0;
    let mut largest: Option<WastePiece> = None;

    for plate in plates {
        for waste in plate.waste_areas.iter().filter(|w| w.reusable) {
            reusable_waste_pieces += 1;
            if largest.as_ref().map_or(true, |l| waste.area > l.area) {
                largest = Some(WastePiece {
                    plate_number: plate.plate_number,
                    x: waste.x,
                    y: waste.y,
                    width: waste.width,
                    height: waste.height,
                    area: waste.area,
                });
            }
        }
    }

    WasteQuality {
        reusable_waste_pieces,
        largest_waste_piece: largest,
    }
}
