use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A requested rectangular glass cut. Expands into `quantity` identical pieces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutRequest {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
}

impl CutRequest {
    pub fn new(id: impl Into<String>, width: f64, height: f64, quantity: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            quantity,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// One physical piece to place, in the orientation it was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceInstance {
    pub id: String,
    pub request_id: String,
    pub width: f64,
    pub height: f64,
}

impl PieceInstance {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Business context used to weight the quality score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationContext {
    /// Plate count and cut count matter most.
    Production,
    /// Utilization and waste quality matter most.
    ExpensiveMaterial,
    /// Fewest cuts wins.
    QuickCut,
    #[default]
    Balanced,
}

impl fmt::Display for OptimizationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizationContext::Production => "PRODUCTION",
            OptimizationContext::ExpensiveMaterial => "EXPENSIVE_MATERIAL",
            OptimizationContext::QuickCut => "QUICK_CUT",
            OptimizationContext::Balanced => "BALANCED",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OptimizationContext {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PRODUCTION" => Ok(OptimizationContext::Production),
            "EXPENSIVE_MATERIAL" => Ok(OptimizationContext::ExpensiveMaterial),
            "QUICK_CUT" => Ok(OptimizationContext::QuickCut),
            "BALANCED" => Ok(OptimizationContext::Balanced),
            _ => Err(format!(
                "unknown context '{}' (expected production, expensive-material, quick-cut or balanced)",
                s
            )),
        }
    }
}

/// How instruction steps are numbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepNumbering {
    /// One sequence across the whole plan.
    #[default]
    Global,
    /// Restart at 1 on every plate.
    PerPlate,
}

/// Knobs for a single optimization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizeOptions {
    pub context: OptimizationContext,
    /// Upper bound on the number of distinct plans returned (primary included).
    pub max_alternatives: usize,
    pub enable_refinement: bool,
    pub enable_validation: bool,
    /// Disable for patterned glass or material with a grain.
    pub allow_rotation: bool,
    pub step_numbering: StepNumbering,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            context: OptimizationContext::Balanced,
            max_alternatives: 8,
            enable_refinement: true,
            enable_validation: true,
            allow_rotation: true,
            step_numbering: StepNumbering::Global,
        }
    }
}

/// Input: what the caller provides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    pub plate_width: f64,
    pub plate_height: f64,
    pub cuts: Vec<CutRequest>,
    #[serde(default)]
    pub options: OptimizeOptions,
}

/// Placement of a piece on a plate, in the plate's canonical top-left frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPiece {
    pub id: String,
    pub request_id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Width and height are swapped relative to the originating request.
    pub rotated: bool,
}

impl PlacedPiece {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Leftover rectangle of a plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub area: f64,
    /// Large enough to keep as an offcut for a later job.
    pub reusable: bool,
}

impl WasteArea {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Result for a single plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateOptimization {
    pub plate_number: u32,
    pub width: f64,
    pub height: f64,
    pub pieces: Vec<PlacedPiece>,
    pub waste_areas: Vec<WasteArea>,
    pub utilization: f64,
    pub waste_percentage: f64,
}

impl PlateOptimization {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn used_area(&self) -> f64 {
        self.pieces.iter().map(PlacedPiece::area).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutType {
    Horizontal,
    Vertical,
}

impl fmt::Display for CutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutType::Horizontal => f.write_str("horizontal"),
            CutType::Vertical => f.write_str("vertical"),
        }
    }
}

/// A finished piece freed by a cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultingPiece {
    /// 1-based position of the piece in its plate's piece list.
    pub piece_number: u32,
    pub piece_id: String,
    pub width: f64,
    pub height: f64,
}

/// One straight edge-to-edge cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutInstruction {
    pub step: u32,
    pub plate_number: u32,
    #[serde(rename = "type")]
    pub cut_type: CutType,
    /// y of a horizontal cut, x of a vertical cut.
    pub position: f64,
    /// Span of the cut along the other axis.
    pub start: f64,
    pub end: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resulting_pieces: Vec<ResultingPiece>,
}

impl CutInstruction {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// First piece freed by this cut, if any.
    pub fn resulting_piece(&self) -> Option<&ResultingPiece> {
        self.resulting_pieces.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
}

/// Largest reusable offcut of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WastePiece {
    pub plate_number: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub area: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteQuality {
    pub reusable_waste_pieces: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub largest_waste_piece: Option<WastePiece>,
}

/// A complete cutting plan produced by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub total_plates: u32,
    pub plates: Vec<PlateOptimization>,
    pub average_utilization: f64,
    /// Uncovered plate area across all plates, in cm².
    pub total_waste: f64,
    pub instructions: Vec<CutInstruction>,
    pub total_guillotine_cuts: u32,
    pub strategy: StrategyInfo,
    pub waste_quality: WasteQuality,
}

impl OptimizationResult {
    /// A plan with no plates, used when no strategy could produce anything.
    pub fn empty(strategy: StrategyInfo) -> Self {
        Self {
            total_plates: 0,
            plates: Vec::new(),
            average_utilization: 0.0,
            total_waste: 0.0,
            instructions: Vec::new(),
            total_guillotine_cuts: 0,
            strategy,
            waste_quality: WasteQuality::default(),
        }
    }

    pub fn total_pieces(&self) -> usize {
        self.plates.iter().map(|p| p.pieces.len()).sum()
    }

    pub fn used_area(&self) -> f64 {
        self.plates.iter().map(PlateOptimization::used_area).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    pub total_score: f64,
    pub compactness_score: f64,
    pub waste_score: f64,
    pub cut_score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Uniform,
    ManySmall,
    FewLarge,
    LargeDominant,
    Mixed,
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileType::Uniform => "UNIFORM",
            ProfileType::ManySmall => "MANY_SMALL",
            ProfileType::FewLarge => "FEW_LARGE",
            ProfileType::LargeDominant => "LARGE_DOMINANT",
            ProfileType::Mixed => "MIXED",
        };
        f.write_str(name)
    }
}

/// Shape of the expanded piece list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestProfile {
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
    pub piece_count: usize,
    pub total_area: f64,
    pub median_area: f64,
    /// Coefficient of variation of piece areas.
    pub area_variation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationMetadata {
    pub confidence_level: ConfidenceLevel,
    pub context: OptimizationContext,
    pub strategies_evaluated: usize,
    pub feasible_strategies: usize,
    /// The primary plan came out of the refinement pass.
    pub refinement_applied: bool,
    pub refinement_iterations: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionKind {
    Rotation,
    PlateSize,
    Consolidation,
    WasteReuse,
    Context,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuggestionKind::Rotation => "ROTATION",
            SuggestionKind::PlateSize => "PLATE_SIZE",
            SuggestionKind::Consolidation => "CONSOLIDATION",
            SuggestionKind::WasteReuse => "WASTE_REUSE",
            SuggestionKind::Context => "CONTEXT",
        };
        f.write_str(name)
    }
}

/// Non-binding advice for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub description: String,
}

/// Output: what the orchestrator returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedOptimizationResult {
    pub primary: OptimizationResult,
    pub primary_score: QualityScore,
    pub alternatives: Vec<OptimizationResult>,
    pub alternative_scores: Vec<QualityScore>,
    pub profile: RequestProfile,
    pub metadata: OptimizationMetadata,
    pub validation: ValidationReport,
    pub suggestions: Vec<Suggestion>,
}

impl EnhancedOptimizationResult {
    /// Primary followed by the alternatives, in rank order.
    pub fn ranked(&self) -> RankedPlans {
        let mut plans = Vec::with_capacity(self.alternatives.len() + 1);
        plans.push(self.primary.clone());
        plans.extend(self.alternatives.iter().cloned());

        let mut scores = Vec::with_capacity(plans.len());
        scores.push(self.primary_score);
        scores.extend(self.alternative_scores.iter().copied());

        RankedPlans { plans, scores }
    }
}

/// Immutable ranked list of plans; the head is the selected plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlans {
    plans: Vec<OptimizationResult>,
    scores: Vec<QualityScore>,
}

impl RankedPlans {
    pub fn new(plans: Vec<OptimizationResult>, scores: Vec<QualityScore>) -> Self {
        debug_assert_eq!(plans.len(), scores.len());
        Self { plans, scores }
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn plans(&self) -> &[OptimizationResult] {
        &self.plans
    }

    pub fn scores(&self) -> &[QualityScore] {
        &self.scores
    }

    pub fn primary(&self) -> Option<(&OptimizationResult, &QualityScore)> {
        self.plans.first().zip(self.scores.first())
    }

    pub fn alternatives(&self) -> impl Iterator<Item = (&OptimizationResult, &QualityScore)> {
        self.plans.iter().zip(self.scores.iter()).skip(1)
    }

    /// Returns a new list with entry `index` moved to the head; the others keep their order.
    pub fn select(&self, index: usize) -> Option<RankedPlans> {
        if index >= self.plans.len() {
            return None;
        }

        let mut order: Vec<usize> = (0..self.plans.len()).filter(|&i| i != index).collect();
        order.insert(0, index);

        Some(RankedPlans {
            plans: order.iter().map(|&i| self.plans[i].clone()).collect(),
            scores: order.iter().map(|&i| self.scores[i]).collect(),
        })
    }
}

/// A request whose pieces cannot fit the plate in any allowed orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OversizedPiece {
    pub request_id: String,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for OversizedPiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' ({} × {} cm)", self.request_id, self.width, self.height)
    }
}

fn join_oversized(pieces: &[OversizedPiece]) -> String {
    pieces
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error type for optimization
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "Pieces exceed the {plate_width} × {plate_height} cm plate in every allowed orientation: {}",
        join_oversized(.pieces)
    )]
    PieceExceedsPlate {
        plate_width: f64,
        plate_height: f64,
        pieces: Vec<OversizedPiece>,
    },

    #[error("Tiling invariant violated on plate {plate_number}: {detail}")]
    TilingInvariantViolation { plate_number: u32, detail: String },

    #[error("No feasible packing strategy for this request")]
    ScoringDegenerate,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project storage failed: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
