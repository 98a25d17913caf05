use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::model::ids::{InstrumentId, ItemId, OptionId, TypeTag};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InstrumentError {
    #[error("instrument title cannot be empty")]
    EmptyTitle,

    #[error("instrument must declare at least one item")]
    NoItems,

    #[error("duplicate item id: {0}")]
    DuplicateItem(ItemId),

    #[error("duplicate option id {option} on item {item}")]
    DuplicateOption { item: ItemId, option: OptionId },

    #[error("item {0} does not match the instrument's scoring kind")]
    ItemKindMismatch(ItemId),

    #[error("categorical instrument must declare at least one category")]
    NoCategories,

    #[error("duplicate category key: {0}")]
    DuplicateCategory(String),

    #[error("item {item} option tag '{tag}' is not a declared category")]
    UnknownCategoryTag { item: ItemId, tag: String },

    #[error("scale range is invalid: min {min} must be below max {max}")]
    InvalidScaleRange { min: i32, max: i32 },

    #[error("item {item} uses a scale different from the instrument's declared range")]
    ScaleRangeMismatch { item: ItemId },

    #[error("likert instrument must declare at least one dimension")]
    NoDimensions,

    #[error("duplicate dimension key: {0}")]
    DuplicateDimension(String),

    #[error("dimension '{dimension}' references unknown item {item}")]
    UnknownDimensionItem { dimension: String, item: ItemId },

    #[error("forced-choice instrument must declare at least two types in its cycle")]
    CycleTooShort,

    #[error("duplicate type tag in cycle: {0}")]
    DuplicateType(TypeTag),

    #[error("item {item} option is tagged with undeclared type {tag}")]
    UnknownTypeTag { item: ItemId, tag: TypeTag },

    #[error("type {0} has no declared growth/stress direction")]
    MissingDirection(TypeTag),
}

//
// ─── SCORING DESCRIPTORS ───────────────────────────────────────────────────────
//

/// Which of the three aggregation algorithms an instrument is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringKind {
    CategoricalDistribution,
    DimensionalLikert,
    PairedForcedChoice,
}

impl ScoringKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringKind::CategoricalDistribution => "categorical_distribution",
            ScoringKind::DimensionalLikert => "dimensional_likert",
            ScoringKind::PairedForcedChoice => "paired_forced_choice",
        }
    }
}

/// A scoring category for categorical instruments.
///
/// Declaration order is significant: it is the tie-break order when two
/// categories reach the same percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub label: String,
}

/// Inclusive integer scale for Likert items, e.g. 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleRange {
    min: i32,
    max: i32,
}

impl ScaleRange {
    /// # Errors
    ///
    /// Returns `InstrumentError::InvalidScaleRange` if `min >= max`.
    pub fn new(min: i32, max: i32) -> Result<Self, InstrumentError> {
        if min >= max {
            return Err(InstrumentError::InvalidScaleRange { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> i32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> i32 {
        self.max
    }

    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.max - self.min
    }
}

/// A named dimension of a Likert instrument and the items that feed it.
///
/// Declaration order breaks ties when ranking strengths and weaknesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    pub label: String,
    pub items: Vec<ItemId>,
}

/// Fixed type topology for paired forced-choice instruments.
///
/// `cycle` fixes the adjacency ring used for wing resolution; the two maps
/// give the integration (growth) and disintegration (stress) direction for
/// each type. All three are static configuration, independent of answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedChoiceSpec {
    cycle: Vec<TypeTag>,
    integration: BTreeMap<TypeTag, TypeTag>,
    disintegration: BTreeMap<TypeTag, TypeTag>,
}

impl ForcedChoiceSpec {
    /// # Errors
    ///
    /// Returns `InstrumentError` if the cycle is shorter than two types,
    /// contains duplicates, or either direction map is missing a declared
    /// type or references an undeclared one.
    pub fn new(
        cycle: Vec<TypeTag>,
        integration: BTreeMap<TypeTag, TypeTag>,
        disintegration: BTreeMap<TypeTag, TypeTag>,
    ) -> Result<Self, InstrumentError> {
        if cycle.len() < 2 {
            return Err(InstrumentError::CycleTooShort);
        }
        let mut seen = HashSet::with_capacity(cycle.len());
        for tag in &cycle {
            if !seen.insert(*tag) {
                return Err(InstrumentError::DuplicateType(*tag));
            }
        }
        for map in [&integration, &disintegration] {
            for tag in &cycle {
                let target = map
                    .get(tag)
                    .ok_or(InstrumentError::MissingDirection(*tag))?;
                if !seen.contains(target) {
                    return Err(InstrumentError::MissingDirection(*target));
                }
            }
        }
        Ok(Self {
            cycle,
            integration,
            disintegration,
        })
    }

    #[must_use]
    pub fn cycle(&self) -> &[TypeTag] {
        &self.cycle
    }

    #[must_use]
    pub fn declares(&self, tag: TypeTag) -> bool {
        self.cycle.contains(&tag)
    }

    /// The two types adjacent to `tag` in the cycle, or `None` for an
    /// undeclared tag.
    #[must_use]
    pub fn neighbors(&self, tag: TypeTag) -> Option<(TypeTag, TypeTag)> {
        let pos = self.cycle.iter().position(|t| *t == tag)?;
        let len = self.cycle.len();
        let before = self.cycle[(pos + len - 1) % len];
        let after = self.cycle[(pos + 1) % len];
        Some((before, after))
    }

    #[must_use]
    pub fn integration_of(&self, tag: TypeTag) -> Option<TypeTag> {
        self.integration.get(&tag).copied()
    }

    #[must_use]
    pub fn disintegration_of(&self, tag: TypeTag) -> Option<TypeTag> {
        self.disintegration.get(&tag).copied()
    }
}

/// Kind-specific scoring configuration carried by an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringSpec {
    Categorical { categories: Vec<Category> },
    Likert { range: ScaleRange, dimensions: Vec<Dimension> },
    ForcedChoice { types: ForcedChoiceSpec },
}

impl ScoringSpec {
    #[must_use]
    pub fn kind(&self) -> ScoringKind {
        match self {
            ScoringSpec::Categorical { .. } => ScoringKind::CategoricalDistribution,
            ScoringSpec::Likert { .. } => ScoringKind::DimensionalLikert,
            ScoringSpec::ForcedChoice { .. } => ScoringKind::PairedForcedChoice,
        }
    }
}

//
// ─── ITEMS ─────────────────────────────────────────────────────────────────────
//

/// A selectable option tagged with the category it counts toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub label: String,
    pub category: String,
}

/// One side of a forced-choice pair, tagged with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOption {
    pub id: OptionId,
    pub label: String,
    pub tag: TypeTag,
}

/// The answerable part of an item, shaped by the instrument's scoring kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Choice { options: Vec<ChoiceOption> },
    Scale { range: ScaleRange },
    Pair { options: [PairOption; 2] },
}

/// A single question within an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub prompt: String,
    pub body: ItemBody,
}

//
// ─── FEEDBACK ──────────────────────────────────────────────────────────────────
//

/// Static narrative text attached to a winning category, type, or dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub strengths: String,
    pub areas_for_improvement: String,
    pub recommendations: String,
}

/// Instrument-specific lookup table from a winning key to its feedback text.
///
/// Content only; scoring never computes anything from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTable(BTreeMap<String, FeedbackEntry>);

impl FeedbackTable {
    #[must_use]
    pub fn new(entries: BTreeMap<String, FeedbackEntry>) -> Self {
        Self(entries)
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&FeedbackEntry> {
        self.0.get(key)
    }
}

//
// ─── INSTRUMENT ────────────────────────────────────────────────────────────────
//

/// A complete questionnaire definition: ordered items, a scoring spec, and
/// the static feedback table. Immutable at runtime; loaded once at process
/// start by the configuration collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    id: InstrumentId,
    title: String,
    spec: ScoringSpec,
    items: Vec<Item>,
    #[serde(default)]
    feedback: FeedbackTable,
}

impl Instrument {
    /// Build and validate an instrument.
    ///
    /// # Errors
    ///
    /// Returns `InstrumentError` if the title is empty, there are no items,
    /// ids collide, or any item's body does not line up with the declared
    /// scoring spec (wrong body kind, undeclared category/type tag, or a
    /// scale range differing from the instrument's).
    pub fn new(
        id: InstrumentId,
        title: impl Into<String>,
        spec: ScoringSpec,
        items: Vec<Item>,
        feedback: FeedbackTable,
    ) -> Result<Self, InstrumentError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(InstrumentError::EmptyTitle);
        }
        if items.is_empty() {
            return Err(InstrumentError::NoItems);
        }

        let mut item_ids = HashSet::with_capacity(items.len());
        for item in &items {
            if !item_ids.insert(item.id) {
                return Err(InstrumentError::DuplicateItem(item.id));
            }
            validate_option_ids(item)?;
        }

        match &spec {
            ScoringSpec::Categorical { categories } => {
                validate_categorical(categories, &items)?;
            }
            ScoringSpec::Likert { range, dimensions } => {
                validate_likert(*range, dimensions, &items)?;
            }
            ScoringSpec::ForcedChoice { types } => {
                validate_forced_choice(types, &items)?;
            }
        }

        Ok(Self {
            id,
            title,
            spec,
            items,
            feedback,
        })
    }

    #[must_use]
    pub fn id(&self) -> InstrumentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ScoringKind {
        self.spec.kind()
    }

    #[must_use]
    pub fn spec(&self) -> &ScoringSpec {
        &self.spec
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn feedback(&self) -> &FeedbackTable {
        &self.feedback
    }
}

fn validate_option_ids(item: &Item) -> Result<(), InstrumentError> {
    let option_ids: Vec<OptionId> = match &item.body {
        ItemBody::Choice { options } => options.iter().map(|o| o.id).collect(),
        ItemBody::Pair { options } => options.iter().map(|o| o.id).collect(),
        ItemBody::Scale { .. } => Vec::new(),
    };
    let mut seen = HashSet::with_capacity(option_ids.len());
    for id in option_ids {
        if !seen.insert(id) {
            return Err(InstrumentError::DuplicateOption {
                item: item.id,
                option: id,
            });
        }
    }
    Ok(())
}

fn validate_categorical(categories: &[Category], items: &[Item]) -> Result<(), InstrumentError> {
    if categories.is_empty() {
        return Err(InstrumentError::NoCategories);
    }
    let mut keys = HashSet::with_capacity(categories.len());
    for category in categories {
        if !keys.insert(category.key.as_str()) {
            return Err(InstrumentError::DuplicateCategory(category.key.clone()));
        }
    }
    for item in items {
        let ItemBody::Choice { options } = &item.body else {
            return Err(InstrumentError::ItemKindMismatch(item.id));
        };
        for option in options {
            if !keys.contains(option.category.as_str()) {
                return Err(InstrumentError::UnknownCategoryTag {
                    item: item.id,
                    tag: option.category.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_likert(
    range: ScaleRange,
    dimensions: &[Dimension],
    items: &[Item],
) -> Result<(), InstrumentError> {
    if dimensions.is_empty() {
        return Err(InstrumentError::NoDimensions);
    }
    let mut item_ids = HashSet::with_capacity(items.len());
    for item in items {
        let ItemBody::Scale { range: item_range } = &item.body else {
            return Err(InstrumentError::ItemKindMismatch(item.id));
        };
        if *item_range != range {
            return Err(InstrumentError::ScaleRangeMismatch { item: item.id });
        }
        item_ids.insert(item.id);
    }
    let mut keys = HashSet::with_capacity(dimensions.len());
    for dimension in dimensions {
        if !keys.insert(dimension.key.as_str()) {
            return Err(InstrumentError::DuplicateDimension(dimension.key.clone()));
        }
        for item in &dimension.items {
            if !item_ids.contains(item) {
                return Err(InstrumentError::UnknownDimensionItem {
                    dimension: dimension.key.clone(),
                    item: *item,
                });
            }
        }
    }
    Ok(())
}

fn validate_forced_choice(types: &ForcedChoiceSpec, items: &[Item]) -> Result<(), InstrumentError> {
    for item in items {
        let ItemBody::Pair { options } = &item.body else {
            return Err(InstrumentError::ItemKindMismatch(item.id));
        };
        for option in options {
            if !types.declares(option.tag) {
                return Err(InstrumentError::UnknownTypeTag {
                    item: item.id,
                    tag: option.tag,
                });
            }
        }
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
