use assess_core::model::{
    AnswerValue, AssignmentId, AssignmentStatus, InstrumentId, ItemId, ResponseId, RewardEntry,
    ScoreBreakdown, SubjectId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{AnswerRow, AssignmentRecord, ResultRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn instrument_id_from_i64(v: i64) -> Result<InstrumentId, StorageError> {
    Ok(InstrumentId::new(i64_to_u64("instrument_id", v)?))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    Ok(ItemId::new(i64_to_u64("item_id", v)?))
}

pub(crate) fn map_assignment_row(row: &SqliteRow) -> Result<AssignmentRecord, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(AssignmentRecord {
        id: AssignmentId::new(row.try_get("id").map_err(ser)?),
        subject_id: subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?,
        instrument_id: instrument_id_from_i64(row.try_get("instrument_id").map_err(ser)?)?,
        assigned_by: subject_id_from_i64(row.try_get("assigned_by").map_err(ser)?)?,
        status: AssignmentStatus::parse(&status).map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn answer_value_to_json(value: &AnswerValue) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<AnswerRow, StorageError> {
    let raw: String = row.try_get("value").map_err(ser)?;
    Ok(AnswerRow {
        item_id: item_id_from_i64(row.try_get("item_id").map_err(ser)?)?,
        value: serde_json::from_str(&raw).map_err(ser)?,
        answered_at: row.try_get("answered_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn breakdown_to_json(breakdown: &ScoreBreakdown) -> Result<String, StorageError> {
    serde_json::to_string(breakdown).map_err(ser)
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ResultRecord, StorageError> {
    let raw: String = row.try_get("breakdown").map_err(ser)?;
    Ok(ResultRecord {
        response_id: ResponseId::new(row.try_get("response_id").map_err(ser)?),
        assignment_id: AssignmentId::new(row.try_get("assignment_id").map_err(ser)?),
        subject_id: subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?,
        instrument_id: instrument_id_from_i64(row.try_get("instrument_id").map_err(ser)?)?,
        breakdown: serde_json::from_str(&raw).map_err(ser)?,
        strengths: row.try_get("strengths").map_err(ser)?,
        areas_for_improvement: row.try_get("areas_for_improvement").map_err(ser)?,
        recommendations: row.try_get("recommendations").map_err(ser)?,
        analyzed: row.try_get("analyzed").map_err(ser)?,
        mentor_feedback: row.try_get("mentor_feedback").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_reward_row(row: &SqliteRow) -> Result<RewardEntry, StorageError> {
    Ok(RewardEntry {
        subject_id: subject_id_from_i64(row.try_get("subject_id").map_err(ser)?)?,
        points: row.try_get("points").map_err(ser)?,
        reason: row.try_get("reason").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
