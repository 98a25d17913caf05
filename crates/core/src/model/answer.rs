use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::{ItemId, OptionId};

/// A subject's recorded value for one item: the chosen option for
/// choice-based and forced-choice items, or the raw scale value for Likert
/// items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Choice(OptionId),
    Scale(i32),
}

/// Materialized answers for one response, keyed by item.
///
/// Unanswered items are simply absent. A `BTreeMap` keeps iteration order
/// deterministic, which keeps scoring and tests reproducible.
pub type AnswerMap = BTreeMap<ItemId, AnswerValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_for_same_item_overwrites() {
        let mut answers = AnswerMap::new();
        answers.insert(ItemId::new(1), AnswerValue::Scale(2));
        answers.insert(ItemId::new(1), AnswerValue::Scale(4));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(&ItemId::new(1)), Some(&AnswerValue::Scale(4)));
    }

    #[test]
    fn answer_value_serializes_with_kind_tag() {
        let json = serde_json::to_string(&AnswerValue::Choice(OptionId::new(7))).unwrap();
        assert!(json.contains("choice"));
        let back: AnswerValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AnswerValue::Choice(OptionId::new(7)));
    }
}
