//! SVG plate diagrams.

use crate::orientation::{transform_result, PlateOrientation};
use crate::types::OptimizationResult;
use std::fmt::Write;

const MARGIN: f64 = 20.0;
const SCALE: f64 = 2.0;
const PLATE_SPACING: f64 = 40.0;

/// Draws every plate of `result` stacked vertically, as seen from `orientation`.
///
/// Pieces are green and labelled with their id (`(R)` when rotated), reusable
/// offcuts are light blue and fragmented waste is hatched grey.
pub fn render_svg(
    result: &OptimizationResult,
    orientation: PlateOrientation,
) -> Result<String, std::fmt::Error> {
    let result = transform_result(result, orientation);
    let mut svg = String::new();

    let max_width = result.plates.iter().map(|p| p.width).fold(0.0, f64::max);
    let total_height: f64 = result
        .plates
        .iter()
        .map(|p| p.height / SCALE + PLATE_SPACING)
        .sum();

    let svg_width = (max_width / SCALE) + (2.0 * MARGIN);
    let svg_height = total_height + (2.0 * MARGIN);

    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        svg_width, svg_height, svg_width, svg_height
    )?;
    writeln!(svg, "  <defs>")?;
    writeln!(
        svg,
        r##"    <pattern id="scrap" width="6" height="6" patternUnits="userSpaceOnUse" patternTransform="rotate(45)"><line x1="0" y1="0" x2="0" y2="6" stroke="#bdbdbd" stroke-width="2"/></pattern>"##
    )?;
    writeln!(svg, "  </defs>")?;
    writeln!(svg, r##"  <rect width="100%" height="100%" fill="#f5f5f5"/>"##)?;

    let mut y_offset = MARGIN;

    for plate in &result.plates {
        let x = MARGIN;
        let plate_width = plate.width / SCALE;
        let plate_height = plate.height / SCALE;

        writeln!(
            svg,
            r##"  <rect x="{}" y="{}" width="{}" height="{}" fill="#ffffff" stroke="#333" stroke-width="2"/>"##,
            x, y_offset, plate_width, plate_height
        )?;
        writeln!(
            svg,
            r##"  <text x="{}" y="{}" font-family="Arial" font-size="14" fill="#333">Plate {} ({:.1}% used, from {})</text>"##,
            x,
            y_offset - 5.0,
            plate.plate_number,
            plate.utilization,
            orientation.label().to_lowercase()
        )?;

        for waste in &plate.waste_areas {
            let fill = if waste.reusable {
                "#BBDEFB"
            } else {
                "url(#scrap)"
            };
            writeln!(
                svg,
                r##"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="#90A4AE" stroke-width="0.5"/>"##,
                x + waste.x / SCALE,
                y_offset + waste.y / SCALE,
                waste.width / SCALE,
                waste.height / SCALE,
                fill
            )?;
        }

        for piece in &plate.pieces {
            let px = x + (piece.x / SCALE);
            let py = y_offset + (piece.y / SCALE);
            let pw = piece.width / SCALE;
            let ph = piece.height / SCALE;

            writeln!(
                svg,
                r##"  <rect x="{}" y="{}" width="{}" height="{}" fill="#4CAF50" stroke="#2E7D32" stroke-width="1" opacity="0.7"/>"##,
                px, py, pw, ph
            )?;

            let label = if piece.rotated {
                format!("{} (R)", escape(&piece.id))
            } else {
                escape(&piece.id)
            };
            writeln!(
                svg,
                r##"  <text x="{}" y="{}" font-family="Arial" font-size="10" fill="#fff" text-anchor="middle">{}</text>"##,
                px + pw / 2.0,
                py + ph / 2.0 + 3.0,
                label
            )?;
            writeln!(
                svg,
                r##"  <text x="{}" y="{}" font-family="Arial" font-size="8" fill="#fff" text-anchor="middle">{} × {}</text>"##,
                px + pw / 2.0,
                py + ph / 2.0 + 13.0,
                piece.width,
                piece.height
            )?;
        }

        y_offset += plate_height + PLATE_SPACING;
    }

    writeln!(
        svg,
        r##"  <text x="{}" y="{}" font-family="Arial" font-size="12" fill="#666">Plates: {} | Utilization: {:.1}% | Cuts: {}</text>"##,
        MARGIN,
        svg_height - MARGIN + 15.0,
        result.total_plates,
        result.average_utilization,
        result.total_guillotine_cuts
    )?;
    writeln!(svg, "</svg>")?;

    Ok(svg)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
