use crate::config::ProfileThresholds;
use crate::types::{PieceInstance, ProfileType, RequestProfile};

/// Classifies the expanded piece list so strategies can be ordered for it.
///
/// Checked in order: `UNIFORM`, `MANY_SMALL`, `FEW_LARGE`, `LARGE_DOMINANT`,
/// falling back to `MIXED`.
pub fn classify(
    pieces: &[PieceInstance],
    plate_area: f64,
    thresholds: &ProfileThresholds,
) -> RequestProfile {
    let mut areas: Vec<f64> = pieces.iter().map(PieceInstance::area).collect();
    areas.sort_by(|a, b| a.total_cmp(b));

    let count = areas.len();
    let total_area: f64 = areas.iter().sum();
    let median_area = median(&areas);
    let area_variation = coefficient_of_variation(&areas);

    let profile_type = if count == 0 {
        ProfileType::Mixed
    } else if area_variation <= thresholds.uniform_variation {
        ProfileType::Uniform
    } else if count >= thresholds.many_small_min_count
        && median_area < plate_area * thresholds.many_small_area_ratio
    {
        ProfileType::ManySmall
    } else if count <= thresholds.few_large_max_count
        && median_area >= plate_area * thresholds.few_large_area_ratio
    {
        ProfileType::FewLarge
    } else if dominant_share(&areas, thresholds.dominant_piece_share) >= thresholds.dominant_area_share
    {
        ProfileType::LargeDominant
    } else {
        ProfileType::Mixed
    };

    RequestProfile {
        profile_type,
        piece_count: count,
        total_area,
        median_area,
        area_variation,
    }
}

/// Median of an ascending slice.
fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

/// Share of the total area covered by the largest `piece_share` of the pieces
/// (at least one piece).
fn dominant_share(sorted: &[f64], piece_share: f64) -> f64 {
    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let take = ((sorted.len() as f64 * piece_share).ceil() as usize).max(1);
    sorted.iter().rev().take(take).sum::<f64>() / total
}
