//! Dimensional Likert scoring: each dimension averages the raw values of
//! its *answered* items and normalizes the mean onto 0–100. Items not yet
//! answered are excluded, never treated as zero.

use std::collections::BTreeMap;

use crate::model::{
    AnswerMap, AnswerValue, Dimension, DimensionScore, DimensionalScore, Instrument, ItemBody,
    ItemId, ScaleRange, ScoreBreakdown, ScoredResult,
};

use super::{narrative_for, round_percentage, ScoringError};

pub(super) fn score(
    instrument: &Instrument,
    range: ScaleRange,
    dimensions: &[Dimension],
    answers: &AnswerMap,
) -> Result<ScoredResult, ScoringError> {
    // Validated raw values per answered item.
    let mut values: BTreeMap<ItemId, i32> = BTreeMap::new();
    for (item_id, value) in answers {
        let Some(item) = instrument.item(*item_id) else {
            continue;
        };
        let ItemBody::Scale { .. } = &item.body else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        let AnswerValue::Scale(raw) = value else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        if !range.contains(*raw) {
            return Err(ScoringError::InvalidValue { item: *item_id });
        }
        values.insert(*item_id, *raw);
    }

    if values.is_empty() {
        return Err(ScoringError::InsufficientData);
    }

    let scores: Vec<DimensionScore> = dimensions
        .iter()
        .map(|dimension| {
            let answered: Vec<i32> = dimension
                .items
                .iter()
                .filter_map(|id| values.get(id).copied())
                .collect();
            if answered.is_empty() {
                DimensionScore {
                    key: dimension.key.clone(),
                    label: dimension.label.clone(),
                    score: 0,
                    answered: 0,
                    incomplete: true,
                }
            } else {
                DimensionScore {
                    key: dimension.key.clone(),
                    label: dimension.label.clone(),
                    score: normalize(&answered, range),
                    answered: answered.len() as u32,
                    incomplete: false,
                }
            }
        })
        .collect();

    // The overall total averages every answered item directly; it is not a
    // mean of the dimension scores, and the two diverge when completion is
    // uneven across dimensions.
    let all_values: Vec<i32> = values.values().copied().collect();
    let total = normalize(&all_values, range);

    // Incomplete dimensions never rank. Stable sorts keep declaration
    // order as the tie-break on both ends.
    let complete: Vec<&DimensionScore> = scores.iter().filter(|d| !d.incomplete).collect();
    let mut by_desc = complete.clone();
    by_desc.sort_by(|a, b| b.score.cmp(&a.score));
    let strengths: Vec<String> = by_desc.iter().take(2).map(|d| d.key.clone()).collect();
    let mut by_asc = complete;
    by_asc.sort_by(|a, b| a.score.cmp(&b.score));
    let weaknesses: Vec<String> = by_asc.iter().take(2).map(|d| d.key.clone()).collect();

    let narrative = match strengths.first() {
        Some(key) => narrative_for(instrument, key),
        None => Default::default(),
    };

    Ok(ScoredResult {
        breakdown: ScoreBreakdown::Dimensional(DimensionalScore {
            dimensions: scores,
            total,
            strengths,
            weaknesses,
        }),
        narrative,
    })
}

fn normalize(values: &[i32], range: ScaleRange) -> u8 {
    let sum: i64 = values.iter().map(|v| i64::from(*v)).sum();
    let avg = sum as f64 / values.len() as f64;
    let span = f64::from(range.width());
    round_percentage((avg - f64::from(range.min())) / span * 100.0)
}
