use super::packer::{pack, PackedPlate, RotationPolicy};
use super::Optimizer;
use crate::types::{OptimizationResult, PieceInstance, ProfileType, Result, StrategyInfo};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Order in which pieces are fed to the strip packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceOrdering {
    /// Height desc, then width desc.
    ByHeightDesc,
    /// Width desc, then height desc.
    ByWidthDesc,
    /// Area desc.
    ByAreaDesc,
    /// Short side desc, then long side desc (pieces lie long side horizontal).
    LandscapeByHeight,
}

impl PieceOrdering {
    pub fn name(self) -> &'static str {
        match self {
            PieceOrdering::ByHeightDesc => "BY_HEIGHT_DESC",
            PieceOrdering::ByWidthDesc => "BY_WIDTH_DESC",
            PieceOrdering::ByAreaDesc => "BY_AREA_DESC",
            PieceOrdering::LandscapeByHeight => "LANDSCAPE_BY_HEIGHT",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            PieceOrdering::ByHeightDesc => "Tallest pieces first; builds compact shelves.",
            PieceOrdering::ByWidthDesc => "Widest pieces first; fewer, wider shelves and fewer cuts.",
            PieceOrdering::ByAreaDesc => "Largest pieces first; fewer plates for mixed sizes.",
            PieceOrdering::LandscapeByHeight => {
                "Pieces laid long side horizontal, tallest first; low shelves for small pieces."
            }
        }
    }

    fn compare(self, a: &PieceInstance, b: &PieceInstance) -> Ordering {
        match self {
            PieceOrdering::ByHeightDesc => b
                .height
                .total_cmp(&a.height)
                .then_with(|| b.width.total_cmp(&a.width)),
            PieceOrdering::ByWidthDesc => b
                .width
                .total_cmp(&a.width)
                .then_with(|| b.height.total_cmp(&a.height)),
            PieceOrdering::ByAreaDesc => b.area().total_cmp(&a.area()),
            PieceOrdering::LandscapeByHeight => {
                let (a_short, a_long) = (a.width.min(a.height), a.width.max(a.height));
                let (b_short, b_long) = (b.width.min(b.height), b.width.max(b.height));
                b_short
                    .total_cmp(&a_short)
                    .then_with(|| b_long.total_cmp(&a_long))
            }
        }
    }
}

/// One deterministic packing policy: a piece ordering plus a rotation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    pub ordering: PieceOrdering,
    pub rotation: RotationPolicy,
}

impl Strategy {
    pub const fn new(ordering: PieceOrdering, rotation: RotationPolicy) -> Self {
        Self { ordering, rotation }
    }

    pub fn name(&self) -> String {
        match self.rotation {
            RotationPolicy::Disabled => format!("{}_NO_ROTATION", self.ordering.name()),
            _ => self.ordering.name().to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self.rotation {
            RotationPolicy::Disabled => format!(
                "{} Pieces keep their requested orientation.",
                self.ordering.describe()
            ),
            _ => self.ordering.describe().to_string(),
        }
    }

    pub fn info(&self) -> StrategyInfo {
        StrategyInfo {
            name: self.name(),
            description: self.description(),
        }
    }

    /// Stable sort, so equal pieces keep their request order.
    pub fn order(&self, pieces: &[PieceInstance]) -> Vec<PieceInstance> {
        let mut ordered = pieces.to_vec();
        ordered.sort_by(|a, b| self.ordering.compare(a, b));
        ordered
    }

    /// Strategies to evaluate, the ones best suited to `profile` first.
    /// Without rotation only the `NO_ROTATION` variants remain.
    pub fn for_profile(profile: ProfileType, allow_rotation: bool) -> Vec<Strategy> {
        use PieceOrdering::*;

        let orderings = match profile {
            ProfileType::Uniform => [ByHeightDesc, LandscapeByHeight, ByWidthDesc, ByAreaDesc],
            ProfileType::ManySmall => [LandscapeByHeight, ByHeightDesc, ByAreaDesc, ByWidthDesc],
            ProfileType::FewLarge | ProfileType::LargeDominant => {
                [ByAreaDesc, ByHeightDesc, ByWidthDesc, LandscapeByHeight]
            }
            ProfileType::Mixed => [ByHeightDesc, ByAreaDesc, LandscapeByHeight, ByWidthDesc],
        };

        let mut strategies = Vec::new();
        if allow_rotation {
            strategies.extend(orderings.iter().map(|&ordering| {
                let rotation = if ordering == LandscapeByHeight {
                    RotationPolicy::PreferLandscape
                } else {
                    RotationPolicy::Allowed
                };
                Strategy::new(ordering, rotation)
            }));
        }
        strategies.extend(
            orderings
                .iter()
                .filter(|&&ordering| ordering != LandscapeByHeight)
                .map(|&ordering| Strategy::new(ordering, RotationPolicy::Disabled)),
        );
        strategies
    }
}

impl Optimizer {
    /// Evaluates strategies in parallel. Infeasible strategies are skipped; the
    /// remaining plans keep the order of `strategies`.
    pub(super) fn run_strategies(
        &self,
        pieces: &[PieceInstance],
        strategies: &[Strategy],
    ) -> Vec<OptimizationResult> {
        strategies
            .par_iter()
            .filter_map(|strategy| match self.run_strategy(pieces, strategy) {
                Ok(plan) => {
                    debug!(
                        strategy = %strategy.name(),
                        plates = plan.total_plates,
                        cuts = plan.total_guillotine_cuts,
                        "strategy finished"
                    );
                    Some(plan)
                }
                Err(err) => {
                    debug!(strategy = %strategy.name(), %err, "strategy infeasible");
                    None
                }
            })
            .collect()
    }

    fn run_strategy(
        &self,
        pieces: &[PieceInstance],
        strategy: &Strategy,
    ) -> Result<OptimizationResult> {
        let packed = pack(
            &strategy.order(pieces),
            self.request.plate_width,
            self.request.plate_height,
            strategy.rotation,
        )?;

        Ok(self.assemble(
            packed.into_iter().map(PackedPlate::into_pieces).collect(),
            strategy.info(),
        ))
    }
}
