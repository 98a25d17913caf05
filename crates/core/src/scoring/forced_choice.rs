//! Paired forced-choice scoring: every item is a choice between two
//! type-tagged options; counting the chosen tags yields a primary type,
//! its wing, and the two fixed directional attributes.

use std::collections::BTreeMap;

use crate::model::{
    AnswerMap, AnswerValue, ForcedChoiceSpec, Instrument, ItemBody, ScoreBreakdown, ScoredResult,
    TypeCount, TypeScore, TypeTag,
};

use super::{narrative_for, ScoringError};

pub(super) fn score(
    instrument: &Instrument,
    types: &ForcedChoiceSpec,
    answers: &AnswerMap,
) -> Result<ScoredResult, ScoringError> {
    // BTreeMap keeps tags in ascending order, which is also the primary
    // tie-break order.
    let mut counts: BTreeMap<TypeTag, u32> =
        types.cycle().iter().map(|tag| (*tag, 0)).collect();

    for (item_id, value) in answers {
        let Some(item) = instrument.item(*item_id) else {
            continue;
        };
        let ItemBody::Pair { options } = &item.body else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        let AnswerValue::Choice(option_id) = value else {
            return Err(ScoringError::InvalidValue { item: *item_id });
        };
        let chosen = options
            .iter()
            .find(|o| o.id == *option_id)
            .ok_or(ScoringError::InvalidValue { item: *item_id })?;
        if let Some(count) = counts.get_mut(&chosen.tag) {
            *count += 1;
        }
    }

    let total: u32 = counts.values().sum();
    if total == 0 {
        return Err(ScoringError::InsufficientData);
    }

    // Left-to-right scan in ascending tag order keeping the first strict
    // maximum: the lowest tag wins any tie.
    let mut primary = None;
    for (tag, count) in &counts {
        match primary {
            Some((_, best)) if *count <= best => {}
            _ => primary = Some((*tag, *count)),
        }
    }
    let (primary, _) = primary.ok_or(ScoringError::InsufficientData)?;

    let wing = resolve_wing(types, &counts, primary)?;
    let integration = types
        .integration_of(primary)
        .ok_or(ScoringError::MissingDirection(primary))?;
    let disintegration = types
        .disintegration_of(primary)
        .ok_or(ScoringError::MissingDirection(primary))?;

    let narrative = narrative_for(instrument, &primary.to_string());

    Ok(ScoredResult {
        breakdown: ScoreBreakdown::Typed(TypeScore {
            counts: counts
                .into_iter()
                .map(|(tag, count)| TypeCount { tag, count })
                .collect(),
            primary,
            wing,
            integration,
            disintegration,
        }),
        narrative,
    })
}

/// Of the two cycle neighbors, the one with the higher count; the
/// comparison is `>=` with the lower tag checked first, so it wins ties.
fn resolve_wing(
    types: &ForcedChoiceSpec,
    counts: &BTreeMap<TypeTag, u32>,
    primary: TypeTag,
) -> Result<TypeTag, ScoringError> {
    let (a, b) = types
        .neighbors(primary)
        .ok_or(ScoringError::MissingDirection(primary))?;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo_count = counts.get(&lo).copied().unwrap_or(0);
    let hi_count = counts.get(&hi).copied().unwrap_or(0);
    Ok(if lo_count >= hi_count { lo } else { hi })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FeedbackEntry, FeedbackTable, InstrumentId, Item, ItemId, OptionId, PairOption,
        ScoringSpec,
    };
    use crate::scoring;

    /// Nine types in a 1..9 cycle; item `n` offers tags `left`/`right`.
    fn instrument(pairs: &[(u8, u8)]) -> Instrument {
        let cycle: Vec<TypeTag> = (1..=9).map(TypeTag::new).collect();
        // Enneagram-style direction maps.
        let integration: BTreeMap<TypeTag, TypeTag> =
            [(1, 7), (2, 4), (3, 6), (4, 1), (5, 8), (6, 9), (7, 5), (8, 2), (9, 3)]
                .iter()
                .map(|(a, b)| (TypeTag::new(*a), TypeTag::new(*b)))
                .collect();
        let disintegration: BTreeMap<TypeTag, TypeTag> =
            integration.iter().map(|(a, b)| (*b, *a)).collect();
        let types = ForcedChoiceSpec::new(cycle, integration, disintegration).unwrap();

        let items = pairs
            .iter()
            .enumerate()
            .map(|(n, (left, right))| {
                let id = n as u64 + 1;
                Item {
                    id: ItemId::new(id),
                    prompt: format!("Item {id}"),
                    body: ItemBody::Pair {
                        options: [
                            PairOption {
                                id: OptionId::new(id * 10),
                                label: "a".into(),
                                tag: TypeTag::new(*left),
                            },
                            PairOption {
                                id: OptionId::new(id * 10 + 1),
                                label: "b".into(),
                                tag: TypeTag::new(*right),
                            },
                        ],
                    },
                }
            })
            .collect();

        let mut feedback = std::collections::BTreeMap::new();
        feedback.insert(
            "3".to_string(),
            FeedbackEntry {
                strengths: "Driven".into(),
                areas_for_improvement: "Patience".into(),
                recommendations: "Slow down".into(),
            },
        );
        Instrument::new(
            InstrumentId::new(3),
            "Type profile",
            ScoringSpec::ForcedChoice { types },
            items,
            FeedbackTable::new(feedback),
        )
        .unwrap()
    }

    /// Choose the left (first) option of item `n`.
    fn choose_left(answers: &mut AnswerMap, item: u64) {
        answers.insert(ItemId::new(item), AnswerValue::Choice(OptionId::new(item * 10)));
    }

    #[test]
    fn counts_chosen_tags_and_resolves_directions() {
        // Three votes for type 3, one for type 8.
        let instrument = instrument(&[(3, 8), (3, 8), (3, 8), (8, 3)]);
        let mut answers = AnswerMap::new();
        for item in 1..=4 {
            choose_left(&mut answers, item);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Typed(score) = result.breakdown else {
            panic!("expected typed breakdown");
        };
        assert_eq!(score.primary, TypeTag::new(3));
        assert_eq!(score.integration, TypeTag::new(6));
        assert_eq!(score.disintegration, TypeTag::new(9));
        assert_eq!(result.narrative.strengths, "Driven");
    }

    #[test]
    fn tied_maximum_goes_to_the_lower_type_id() {
        // Types 3 and 7 both collect six votes (the maximum) out of 36 items;
        // the remaining 24 spread four votes over each of six other types.
        let mut pairs = Vec::new();
        pairs.extend(std::iter::repeat_n((3, 9), 6));
        pairs.extend(std::iter::repeat_n((7, 9), 6));
        for tag in [1, 2, 4, 5, 6, 8] {
            pairs.extend(std::iter::repeat_n((tag, 9), 4));
        }
        let instrument = instrument(&pairs);

        let mut answers = AnswerMap::new();
        for item in 1..=36 {
            choose_left(&mut answers, item);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Typed(score) = result.breakdown else {
            panic!("expected typed breakdown");
        };
        assert_eq!(score.counts.iter().map(|c| c.count).sum::<u32>(), 36);
        assert_eq!(score.primary, TypeTag::new(3));
    }

    #[test]
    fn wing_is_the_stronger_neighbor() {
        // Primary 5; neighbor 6 outvotes neighbor 4.
        let instrument = instrument(&[(5, 1), (5, 1), (5, 1), (6, 1), (6, 1), (4, 1)]);
        let mut answers = AnswerMap::new();
        for item in 1..=6 {
            choose_left(&mut answers, item);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Typed(score) = result.breakdown else {
            panic!("expected typed breakdown");
        };
        assert_eq!(score.primary, TypeTag::new(5));
        assert_eq!(score.wing, TypeTag::new(6));
    }

    #[test]
    fn tied_wing_goes_to_the_lower_neighbor() {
        // Primary 5 with neighbors 4 and 6 tied at one vote each.
        let instrument = instrument(&[(5, 1), (5, 1), (4, 1), (6, 1)]);
        let mut answers = AnswerMap::new();
        for item in 1..=4 {
            choose_left(&mut answers, item);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Typed(score) = result.breakdown else {
            panic!("expected typed breakdown");
        };
        assert_eq!(score.primary, TypeTag::new(5));
        assert_eq!(score.wing, TypeTag::new(4));
    }

    #[test]
    fn wing_wraps_around_the_cycle() {
        // Primary 9: neighbors are 8 and 1.
        let instrument = instrument(&[(9, 2), (9, 2), (9, 2), (1, 2), (8, 2), (8, 2)]);
        let mut answers = AnswerMap::new();
        for item in 1..=6 {
            choose_left(&mut answers, item);
        }

        let result = scoring::score(&instrument, &answers).unwrap();
        let ScoreBreakdown::Typed(score) = result.breakdown else {
            panic!("expected typed breakdown");
        };
        assert_eq!(score.primary, TypeTag::new(9));
        assert_eq!(score.wing, TypeTag::new(8));
    }

    #[test]
    fn empty_answers_are_insufficient() {
        let instrument = instrument(&[(1, 2)]);
        let err = scoring::score(&instrument, &AnswerMap::new()).unwrap_err();
        assert_eq!(err, ScoringError::InsufficientData);
    }

    #[test]
    fn foreign_option_id_is_invalid() {
        let instrument = instrument(&[(1, 2)]);
        let mut answers = AnswerMap::new();
        answers.insert(ItemId::new(1), AnswerValue::Choice(OptionId::new(999)));
        let err = scoring::score(&instrument, &answers).unwrap_err();
        assert_eq!(err, ScoringError::InvalidValue { item: ItemId::new(1) });
    }
}
