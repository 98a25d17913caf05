//! Categorical distribution scoring: each answered item votes for the
//! category carried by its chosen option, and percentages are taken over
//! the answered items only, so partial completion scores what was answered.

use crate::model::{
    AnswerMap, AnswerValue, CategoricalScore, Category, CategoryScore, Instrument, ItemBody,
    ScoreBreakdown, ScoredResult,
};

use super::{narrative_for, round_percentage, ScoringError};

pub(super) fn score(
    instrument: &Instrument,
    categories: &[Category],
    answers: &AnswerMap,
) -> Result<ScoredResult, ScoringError> {
    let mut counts = vec![0_u32; categories.len()];

    for (item_id, value) in answers {
        let Some(item) = instrument.item(*item_id) else {
            continue;
        };
        let ItemBody::Choice { options } = &item.body else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        let AnswerValue::Choice(option_id) = value else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        let option = options
            .iter()
            .find(|o| o.id == *option_id)
            .ok_or(ScoringError::InvalidValue { item: *item_id })?;
        let index = categories
            .iter()
            .position(|c| c.key == option.category)
            .ok_or(ScoringError::InvalidValue { item: *item_id })?;
        counts[index] += 1;
    }

    let total: u32 = counts.iter().sum();
    if total == 0 {
        return Err(ScoringError::InsufficientData);
    }

    let scores: Vec<CategoryScore> = categories
        .iter()
        .zip(&counts)
        .map(|(category, count)| CategoryScore {
            key: category.key.clone(),
            label: category.label.clone(),
            count: *count,
            percentage: round_percentage(f64::from(*count) / f64::from(total) * 100.0),
        })
        .collect();

    // Stable sort over the declared category order: equal percentages
    // resolve to the category declared first.
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|a, b| scores[*b].percentage.cmp(&scores[*a].percentage));

    let predominant = scores[ranked[0]].key.clone();
    let secondary = ranked.get(1).map(|i| scores[*i].key.clone());
    let narrative = narrative_for(instrument, &predominant);

    Ok(ScoredResult {
        breakdown: ScoreBreakdown::Categorical(CategoricalScore {
            categories: scores,
            predominant,
            secondary,
            answered: total,
        }),
        narrative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChoiceOption, FeedbackEntry, FeedbackTable, InstrumentId, Item, ItemId, OptionId,
        ScoringSpec,
    };
    use crate::scoring;
    use std::collections::BTreeMap;

    const KEYS: [&str; 4] = ["visual", "auditory", "reading", "kinesthetic"];

    /// One item per answer slot; option `n` of every item votes for
    /// category `KEYS[n]`.
    fn instrument(item_count: u64) -> Instrument {
        let categories = KEYS
            .iter()
            .map(|key| Category {
                key: (*key).to_string(),
                label: key.to_uppercase(),
            })
            .collect();
        let items = (1..=item_count)
            .map(|id| Item {
                id: ItemId::new(id),
                prompt: format!("Item {id}"),
                body: ItemBody::Choice {
                    options: KEYS
                        .iter()
                        .enumerate()
                        .map(|(n, key)| ChoiceOption {
                            id: OptionId::new(id * 10 + n as u64),
                            label: (*key).to_string(),
                            category: (*key).to_string(),
                        })
                        .collect(),
                },
            })
            .collect();
        let mut feedback = BTreeMap::new();
        feedback.insert(
            "visual".to_string(),
            FeedbackEntry {
                strengths: "Strong visual recall".into(),
                areas_for_improvement: "Auditory material".into(),
                recommendations: "Use diagrams".into(),
            },
        );
        Instrument::new(
            InstrumentId::new(1),
            "Learning styles",
            ScoringSpec::Categorical { categories },
            items,
            FeedbackTable::new(feedback),
        )
        .unwrap()
    }

    fn pick(item: u64, category_index: u64) -> (ItemId, AnswerValue) {
        (
            ItemId::new(item),
            AnswerValue::Choice(OptionId::new(item * 10 + category_index)),
        )
    }

    #[test]
    fn distributes_counts_into_percentages() {
        // 24 answers split {visual:9, auditory:6, reading:5, kinesthetic:4}.
        let instrument = instrument(24);
        let mut answers = AnswerMap::new();
        let mut item = 1;
        for (category, count) in [(0, 9), (1, 6), (2, 5), (3, 4)] {
            for _ in 0..count {
                let (id, value) = pick(item, category);
                answers.insert(id, value);
                item += 1;
            }
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Categorical(score) = result.breakdown else {
            panic!("expected categorical breakdown");
        };

        let percentages: Vec<u8> = score.categories.iter().map(|c| c.percentage).collect();
        assert_eq!(percentages, vec![38, 25, 21, 17]);
        assert_eq!(score.predominant, "visual");
        assert_eq!(score.secondary.as_deref(), Some("auditory"));
        assert_eq!(score.answered, 24);
        assert_eq!(result.narrative.strengths, "Strong visual recall");
    }

    #[test]
    fn tie_resolves_to_first_declared_category() {
        // Two answers each for auditory and reading; declaration order puts
        // auditory first.
        let instrument = instrument(4);
        let mut answers = AnswerMap::new();
        for (item, category) in [(1, 1), (2, 1), (3, 2), (4, 2)] {
            let (id, value) = pick(item, category);
            answers.insert(id, value);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Categorical(score) = result.breakdown else {
            panic!("expected categorical breakdown");
        };
        assert_eq!(score.predominant, "auditory");
        assert_eq!(score.secondary.as_deref(), Some("reading"));
    }

    #[test]
    fn partial_completion_scores_answered_items_only() {
        let instrument = instrument(10);
        let mut answers = AnswerMap::new();
        let (id, value) = pick(1, 0);
        answers.insert(id, value);

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Categorical(score) = result.breakdown else {
            panic!("expected categorical breakdown");
        };
        assert_eq!(score.answered, 1);
        assert_eq!(score.categories[0].percentage, 100);
    }

    #[test]
    fn empty_answers_are_insufficient() {
        let instrument = instrument(4);
        let err = scoring::score(&instrument, &AnswerMap::new()).unwrap_err();
        assert_eq!(err, ScoringError::InsufficientData);
    }

    #[test]
    fn unknown_items_are_skipped_but_foreign_options_fail() {
        let instrument = instrument(2);
        let mut answers = AnswerMap::new();
        let (id, value) = pick(1, 0);
        answers.insert(id, value);
        // Item 99 does not exist on this instrument; ignored.
        answers.insert(ItemId::new(99), AnswerValue::Choice(OptionId::new(990)));

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Categorical(score) = result.breakdown else {
            panic!("expected categorical breakdown");
        };
        assert_eq!(score.answered, 1);

        // An option that belongs to a different item is invalid.
        let mut bad = AnswerMap::new();
        bad.insert(ItemId::new(1), AnswerValue::Choice(OptionId::new(20)));
        let err = scoring::score(&instrument, &bad).unwrap_err();
        assert_eq!(err, ScoringError::InvalidValue { item: ItemId::new(1) });
    }

    #[test]
    fn scale_value_on_choice_item_is_invalid() {
        let instrument = instrument(1);
        let mut answers = AnswerMap::new();
        answers.insert(ItemId::new(1), AnswerValue::Scale(3));
        let err = scoring::score(&instrument, &answers).unwrap_err();
        assert_eq!(err, ScoringError::InvalidValue { item: ItemId::new(1) });
    }

    #[test]
    fn tie_break_is_deterministic_across_runs() {
        let instrument = instrument(4);
        let mut answers = AnswerMap::new();
        for (item, category) in [(1, 3), (2, 3), (3, 0), (4, 0)] {
            let (id, value) = pick(item, category);
            answers.insert(id, value);
        }

        for _ in 0..10 {
            let result = scoring::score(&instrument, &answers).unwrap();
            let ScoreBreakdown::Categorical(score) = result.breakdown else {
                panic!("expected categorical breakdown");
            };
            // visual is declared before kinesthetic, so it wins the 50/50 tie.
            assert_eq!(score.predominant, "visual");
            assert_eq!(score.secondary.as_deref(), Some("kinesthetic"));
        }
    }
}
