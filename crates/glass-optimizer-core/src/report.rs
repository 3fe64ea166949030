//! Printable cutting report for the workshop.

use crate::orientation::{transform_result, PlateOrientation};
use crate::types::{EnhancedOptimizationResult, OptimizationResult};
use std::fmt::Write;

/// Plain-text report of `result.primary`: summary, pieces per plate and the
/// numbered cut list, with coordinates measured from `orientation`'s corner.
pub fn render_report(
    result: &EnhancedOptimizationResult,
    orientation: PlateOrientation,
) -> Result<String, std::fmt::Error> {
    let plan = transform_result(&result.primary, orientation);
    let mut out = String::new();

    writeln!(out, "GLASS CUTTING REPORT")?;
    writeln!(out, "====================")?;
    write_summary(&mut out, result, &plan)?;
    writeln!(
        out,
        "Origin:        {} ({})",
        orientation.label(),
        orientation.description()
    )?;

    for plate in &plan.plates {
        writeln!(out)?;
        writeln!(
            out,
            "Plate {} - {} × {} cm, {:.1}% used",
            plate.plate_number, plate.width, plate.height, plate.utilization
        )?;
        for (idx, piece) in plate.pieces.iter().enumerate() {
            writeln!(
                out,
                "  {:>3}. {:<16} {:>7.1} × {:<7.1} at ({:.1}, {:.1}){}",
                idx + 1,
                piece.id,
                piece.width,
                piece.height,
                piece.x,
                piece.y,
                if piece.rotated { "  rotated" } else { "" }
            )?;
        }

        let reusable: Vec<_> = plate.waste_areas.iter().filter(|w| w.reusable).collect();
        if !reusable.is_empty() {
            writeln!(out, "  Reusable offcuts:")?;
            for waste in reusable {
                writeln!(
                    out,
                    "       {:.1} × {:.1} cm at ({:.1}, {:.1})",
                    waste.width, waste.height, waste.x, waste.y
                )?;
            }
        }
    }

    if !plan.instructions.is_empty() {
        writeln!(out)?;
        writeln!(out, "CUT SEQUENCE")?;
        for cut in &plan.instructions {
            write!(out, "  {:>3}. {}", cut.step, cut.description)?;
            if !cut.resulting_pieces.is_empty() {
                let freed: Vec<&str> = cut
                    .resulting_pieces
                    .iter()
                    .map(|p| p.piece_id.as_str())
                    .collect();
                write!(out, "  -> frees {}", freed.join(", "))?;
            }
            writeln!(out)?;
        }
    }

    if !result.suggestions.is_empty() {
        writeln!(out)?;
        writeln!(out, "SUGGESTIONS")?;
        for suggestion in &result.suggestions {
            writeln!(out, "  [{}] {}", suggestion.kind, suggestion.description)?;
        }
    }

    if !result.validation.errors.is_empty() || !result.validation.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "CHECKS")?;
        for error in &result.validation.errors {
            writeln!(out, "  error:   {}", error)?;
        }
        for warning in &result.validation.warnings {
            writeln!(out, "  warning: {}", warning)?;
        }
    }

    Ok(out)
}

fn write_summary(
    out: &mut String,
    result: &EnhancedOptimizationResult,
    plan: &OptimizationResult,
) -> std::fmt::Result {
    writeln!(out, "Strategy:      {}", plan.strategy.name)?;
    writeln!(out, "Context:       {}", result.metadata.context)?;
    writeln!(out, "Plates:        {}", plan.total_plates)?;
    writeln!(out, "Pieces:        {}", plan.total_pieces())?;
    writeln!(out, "Utilization:   {:.1}%", plan.average_utilization)?;
    writeln!(out, "Waste:         {:.1} cm²", plan.total_waste)?;
    writeln!(out, "Cuts:          {}", plan.total_guillotine_cuts)?;
    writeln!(
        out,
        "Score:         {:.1}/100 (confidence {}, {:.0}%)",
        result.primary_score.total_score,
        result.metadata.confidence_level,
        result.primary_score.confidence
    )
}
