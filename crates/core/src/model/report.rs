use serde::{Deserialize, Serialize};

use crate::model::ids::TypeTag;

//
// ─── PER-STRATEGY BREAKDOWNS ───────────────────────────────────────────────────
//

/// One category's share of a categorical result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub key: String,
    pub label: String,
    pub count: u32,
    /// Rounded share of answered items, 0–100.
    pub percentage: u8,
}

/// Normalized output of the categorical-distribution strategy.
///
/// `categories` stays in the instrument's declaration order; `predominant`
/// and `secondary` are resolved with the declaration-order tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalScore {
    pub categories: Vec<CategoryScore>,
    pub predominant: String,
    pub secondary: Option<String>,
    pub answered: u32,
}

/// One dimension's normalized score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub key: String,
    pub label: String,
    /// 0–100 after normalizing the mean of answered items to the scale.
    pub score: u8,
    pub answered: u32,
    /// True when no item of this dimension was answered; the score is 0 and
    /// the dimension is excluded from strengths/weaknesses ranking.
    pub incomplete: bool,
}

/// Normalized output of the dimensional-Likert strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionalScore {
    pub dimensions: Vec<DimensionScore>,
    /// Computed over all answered items directly, not as a mean of the
    /// dimension scores; the two diverge under uneven completion.
    pub total: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub tag: TypeTag,
    pub count: u32,
}

/// Normalized output of the paired forced-choice strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeScore {
    /// Counts in ascending tag order.
    pub counts: Vec<TypeCount>,
    pub primary: TypeTag,
    pub wing: TypeTag,
    pub integration: TypeTag,
    pub disintegration: TypeTag,
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// The instrument-specific structured score, tagged by strategy so it can
/// be persisted as one serialized column and dispatched on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreBreakdown {
    Categorical(CategoricalScore),
    Dimensional(DimensionalScore),
    Typed(TypeScore),
}

/// Free-text feedback resolved from the instrument's static table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub strengths: String,
    pub areas_for_improvement: String,
    pub recommendations: String,
}

/// Output of the scoring engine: the structured breakdown plus narrative
/// text. Pure data; persistence and rewards happen elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub breakdown: ScoreBreakdown,
    pub narrative: Narrative,
}
