use chrono::{DateTime, Utc};

use assess_core::model::{AnswerMap, InstrumentId, Narrative, ResponseId, ScoreBreakdown};
use storage::repository::ResultRecord;

/// Everything a client needs to resume an in-flight assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressSession {
    pub answers: AnswerMap,
    /// Resume position: answered count clamped to the instrument's item
    /// range, so a fully answered but unsubmitted session lands on the
    /// last item rather than past the end.
    pub last_item_index: usize,
    pub started_at: DateTime<Utc>,
}

/// Acknowledgement of a progress save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub response_id: ResponseId,
    /// Number of (item, value) pairs written.
    pub saved: u32,
}

/// A finalized result as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub response_id: ResponseId,
    pub instrument_id: InstrumentId,
    pub breakdown: ScoreBreakdown,
    pub narrative: Narrative,
    pub analyzed: bool,
    pub mentor_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ResultRecord> for StoredResult {
    fn from(record: ResultRecord) -> Self {
        Self {
            response_id: record.response_id,
            instrument_id: record.instrument_id,
            breakdown: record.breakdown,
            narrative: Narrative {
                strengths: record.strengths,
                areas_for_improvement: record.areas_for_improvement,
                recommendations: record.recommendations,
            },
            analyzed: record.analyzed,
            mentor_feedback: record.mentor_feedback,
            created_at: record.created_at,
        }
    }
}
