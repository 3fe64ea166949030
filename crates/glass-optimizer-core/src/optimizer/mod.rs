use crate::config::OptimizerConfig;
use crate::geometry::fits;
use crate::types::*;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

mod instructions;
mod packer;
mod profile;
mod refine;
mod scoring;
mod strategy;
mod suggestions;
mod validation;
mod waste;
#[cfg(test)]
mod tests;

pub use instructions::instructions;
pub(crate) use instructions::describe as describe_cut;
pub use packer::{pack, shelves_of, PackedPlate, RotationPolicy, Shelf};
pub use profile::classify;
pub use scoring::{confidence, confidence_level, score, score_all};
pub use strategy::{PieceOrdering, Strategy};
pub use suggestions::insights;
pub use validation::{check_plate, replay_cuts};
pub use waste::{analyze, waste_quality, WasteAnalysis};

/// Plans glass cuts for one plate size: runs every packing strategy, scores the
/// plans for the requested context and returns the best one with ranked
/// alternatives.
pub struct Optimizer {
    request: OptimizationRequest,
    config: OptimizerConfig,
}

impl Optimizer {
    /// Validates the request and builds an optimizer with the default config.
    pub fn new(request: OptimizationRequest) -> Result<Self> {
        Self::with_config(request, OptimizerConfig::default())
    }

    /// Validates the request. Malformed dimensions or quantities are rejected as
    /// [`OptimizerError::InvalidInput`]; pieces that cannot fit the plate in any
    /// allowed orientation are all reported together as
    /// [`OptimizerError::PieceExceedsPlate`].
    pub fn with_config(request: OptimizationRequest, config: OptimizerConfig) -> Result<Self> {
        let (plate_width, plate_height) = (request.plate_width, request.plate_height);
        if !is_positive(plate_width) || !is_positive(plate_height) {
            return Err(OptimizerError::InvalidInput(format!(
                "Plate dimensions must be positive, got {} × {} cm",
                plate_width, plate_height
            )));
        }

        if request.cuts.is_empty() {
            return Err(OptimizerError::InvalidInput(
                "At least one cut must be requested".to_string(),
            ));
        }

        let mut seen_ids = HashSet::new();
        for cut in &request.cuts {
            if cut.id.trim().is_empty() {
                return Err(OptimizerError::InvalidInput(
                    "Every cut needs a non-empty id".to_string(),
                ));
            }
            if !seen_ids.insert(cut.id.as_str()) {
                return Err(OptimizerError::InvalidInput(format!(
                    "Cut id '{}' is used more than once",
                    cut.id
                )));
            }
            if !is_positive(cut.width) || !is_positive(cut.height) {
                return Err(OptimizerError::InvalidInput(format!(
                    "Cut '{}' must have positive dimensions, got {} × {} cm",
                    cut.id, cut.width, cut.height
                )));
            }
            if cut.quantity == 0 {
                return Err(OptimizerError::InvalidInput(format!(
                    "Cut '{}' ({} × {} cm) must have a quantity of at least 1",
                    cut.id, cut.width, cut.height
                )));
            }
        }

        let allow_rotation = request.options.allow_rotation;
        let oversized: Vec<OversizedPiece> = request
            .cuts
            .iter()
            .filter(|cut| {
                let upright = fits(cut.width, cut.height, plate_width, plate_height);
                let turned = allow_rotation && fits(cut.height, cut.width, plate_width, plate_height);
                !upright && !turned
            })
            .map(|cut| OversizedPiece {
                request_id: cut.id.clone(),
                width: cut.width,
                height: cut.height,
            })
            .collect();

        if !oversized.is_empty() {
            return Err(OptimizerError::PieceExceedsPlate {
                plate_width,
                plate_height,
                pieces: oversized,
            });
        }

        Ok(Self { request, config })
    }

    pub fn request(&self) -> &OptimizationRequest {
        &self.request
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Executes the full optimization flow.
    ///
    /// Never fails: when no strategy yields a plan the result carries an empty
    /// primary and the problem in `validation.errors`.
    pub fn optimize(&self) -> EnhancedOptimizationResult {
        let started = Instant::now();
        let options = &self.request.options;

        let pieces = self.expand_pieces();
        let profile = classify(&pieces, self.plate_area(), &self.config.profile);
        let strategies = Strategy::for_profile(profile.profile_type, options.allow_rotation);
        debug!(
            profile = %profile.profile_type,
            pieces = pieces.len(),
            strategies = strategies.len(),
            "classified request"
        );

        let outcomes = self.run_strategies(&pieces, &strategies);
        let feasible = outcomes.len();
        if outcomes.is_empty() {
            warn!(strategies = strategies.len(), "no feasible packing strategy");
            return self.degenerate_result(profile, strategies.len(), started);
        }

        let scores = self.score_all(&outcomes);
        let set_confidence = scores[0].confidence;
        let (mut plans, mut plan_scores) = self.select_distinct(outcomes, scores);

        let mut refinement_iterations = 0;
        let mut refined_index = None;
        if options.enable_refinement {
            let best = best_index(&plan_scores);
            let refinement = self.refine(&plans[best]);
            refinement_iterations = refinement.iterations;
            if let Some(refined) = refinement.plan {
                debug!(
                    from = plans[best].total_plates,
                    to = refined.total_plates,
                    "refinement removed plates"
                );
                plan_scores.push(self.score_with_confidence(&refined, set_confidence));
                plans.push(refined);
                refined_index = Some(plans.len() - 1);
            }
        }

        let mut order: Vec<usize> = (0..plans.len()).collect();
        order.sort_by(|&a, &b| plan_scores[b].total_score.total_cmp(&plan_scores[a].total_score));
        order.truncate(options.max_alternatives.max(1));
        let refinement_applied = refined_index.is_some() && refined_index == order.first().copied();

        let mut ranked: Vec<(OptimizationResult, QualityScore)> = order
            .iter()
            .map(|&i| (plans[i].clone(), plan_scores[i]))
            .collect();
        let (primary, primary_score) = ranked.remove(0);
        let (alternatives, alternative_scores): (Vec<_>, Vec<_>) = ranked.into_iter().unzip();

        let level = confidence_level(primary_score.confidence, &self.config.confidence);
        let validation = if options.enable_validation {
            let mut report = self.validate(&primary);
            if level == ConfidenceLevel::Low {
                report.warnings.push(format!(
                    "Low confidence ({:.0}%): the strategies disagree or few plans were feasible",
                    primary_score.confidence
                ));
            }
            if !report.is_valid {
                warn!(errors = ?report.errors, "primary plan failed validation");
            }
            report
        } else {
            ValidationReport {
                is_valid: true,
                ..ValidationReport::default()
            }
        };

        let suggestions = self.suggest(&pieces, &primary, &alternatives);

        info!(
            plates = primary.total_plates,
            utilization = primary.average_utilization,
            cuts = primary.total_guillotine_cuts,
            strategy = %primary.strategy.name,
            score = primary_score.total_score,
            "optimization complete"
        );

        EnhancedOptimizationResult {
            primary,
            primary_score,
            alternatives,
            alternative_scores,
            profile,
            metadata: OptimizationMetadata {
                confidence_level: level,
                context: options.context,
                strategies_evaluated: strategies.len(),
                feasible_strategies: feasible,
                refinement_applied,
                refinement_iterations,
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
            validation,
            suggestions,
        }
    }

    /// Runs every strategy for the request and returns the distinct plans, in
    /// strategy order, before scoring.
    pub fn generate_plans(&self) -> Vec<OptimizationResult> {
        let pieces = self.expand_pieces();
        let profile = classify(&pieces, self.plate_area(), &self.config.profile);
        let strategies =
            Strategy::for_profile(profile.profile_type, self.request.options.allow_rotation);
        let outcomes = self.run_strategies(&pieces, &strategies);
        let scores = vec![QualityScore::default(); outcomes.len()];
        let mut plans = self.select_distinct(outcomes, scores).0;
        plans.truncate(self.request.options.max_alternatives.max(1));
        plans
    }

    /// Duplicates cuts according to their requested quantity.
    ///
    /// Instances are named `{id}-{n}`. A name already taken by another cut id
    /// or instance gets a `.{k}` suffix until it is unique.
    fn expand_pieces(&self) -> Vec<PieceInstance> {
        let mut taken: HashSet<String> = self
            .request
            .cuts
            .iter()
            .filter(|cut| cut.quantity == 1)
            .map(|cut| cut.id.clone())
            .collect();

        let mut expanded = Vec::new();
        for cut in &self.request.cuts {
            for i in 0..cut.quantity {
                let id = if cut.quantity > 1 {
                    let base = format!("{}-{}", cut.id, i + 1);
                    let mut id = base.clone();
                    let mut k = 2;
                    while taken.contains(&id) {
                        id = format!("{}.{}", base, k);
                        k += 1;
                    }
                    taken.insert(id.clone());
                    id
                } else {
                    cut.id.clone()
                };
                expanded.push(PieceInstance {
                    id,
                    request_id: cut.id.clone(),
                    width: cut.width,
                    height: cut.height,
                });
            }
        }
        expanded
    }

    fn plate_area(&self) -> f64 {
        self.request.plate_width * self.request.plate_height
    }

    /// Drops near-duplicate plans, keeping the first of each group. The list is
    /// capped at `max_alternatives` only after ranking.
    fn select_distinct(
        &self,
        plans: Vec<OptimizationResult>,
        scores: Vec<QualityScore>,
    ) -> (Vec<OptimizationResult>, Vec<QualityScore>) {
        let step = self.config.dedupe_utilization_step.max(f64::EPSILON);
        let mut seen = HashSet::new();

        plans
            .into_iter()
            .zip(scores)
            .filter(|(plan, _)| {
                seen.insert((
                    plan.total_plates,
                    (plan.average_utilization / step).round() as i64,
                    plan.total_guillotine_cuts,
                    plan.waste_quality.reusable_waste_pieces,
                ))
            })
            .unzip()
    }

    /// Builds a complete plan from per-plate placements: waste, utilization and
    /// numbered cut instructions.
    fn assemble(&self, plates: Vec<Vec<PlacedPiece>>, strategy: StrategyInfo) -> OptimizationResult {
        let (plate_width, plate_height) = (self.request.plate_width, self.request.plate_height);

        let plates: Vec<PlateOptimization> = plates
            .into_iter()
            .enumerate()
            .map(|(idx, pieces)| {
                let analysis = analyze(
                    plate_width,
                    plate_height,
                    &pieces,
                    self.config.reusable_waste_threshold,
                );
                PlateOptimization {
                    plate_number: idx as u32 + 1,
                    width: plate_width,
                    height: plate_height,
                    pieces,
                    waste_areas: analysis.waste_areas,
                    utilization: analysis.utilization,
                    waste_percentage: analysis.waste_percentage,
                }
            })
            .collect();

        let mut all_instructions = Vec::new();
        for plate in &plates {
            let offset = match self.request.options.step_numbering {
                StepNumbering::Global => all_instructions.len() as u32,
                StepNumbering::PerPlate => 0,
            };
            all_instructions.extend(instructions(plate).into_iter().map(|mut cut| {
                cut.step += offset;
                cut
            }));
        }

        let average_utilization = if plates.is_empty() {
            0.0
        } else {
            plates.iter().map(|p| p.utilization).sum::<f64>() / plates.len() as f64
        };
        let total_waste = plates.iter().map(|p| p.area() - p.used_area()).sum();
        let waste_quality = waste_quality(&plates);

        OptimizationResult {
            total_plates: plates.len() as u32,
            plates,
            average_utilization,
            total_waste,
            total_guillotine_cuts: all_instructions.len() as u32,
            instructions: all_instructions,
            strategy,
            waste_quality,
        }
    }

    fn degenerate_result(
        &self,
        profile: RequestProfile,
        strategies_evaluated: usize,
        started: Instant,
    ) -> EnhancedOptimizationResult {
        EnhancedOptimizationResult {
            primary: OptimizationResult::empty(StrategyInfo {
                name: "NONE".to_string(),
                description: "No strategy could place every piece".to_string(),
            }),
            primary_score: QualityScore::default(),
            alternatives: Vec::new(),
            alternative_scores: Vec::new(),
            profile,
            metadata: OptimizationMetadata {
                confidence_level: ConfidenceLevel::Low,
                context: self.request.options.context,
                strategies_evaluated,
                feasible_strategies: 0,
                refinement_applied: false,
                refinement_iterations: 0,
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
            validation: ValidationReport {
                is_valid: false,
                errors: vec![OptimizerError::ScoringDegenerate.to_string()],
                warnings: Vec::new(),
            },
            suggestions: Vec::new(),
        }
    }
}

/// Validates and optimizes in one call.
pub fn optimize(
    cuts: &[CutRequest],
    plate_width: f64,
    plate_height: f64,
    options: OptimizeOptions,
) -> Result<EnhancedOptimizationResult> {
    let optimizer = Optimizer::new(OptimizationRequest {
        plate_width,
        plate_height,
        cuts: cuts.to_vec(),
        options,
    })?;
    Ok(optimizer.optimize())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Index of the highest total score; the earliest wins ties.
fn best_index(scores: &[QualityScore]) -> usize {
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate() {
        if score.total_score > scores[best].total_score {
            best = idx;
        }
    }
    best
}
