mod answer;
mod assignment;
mod catalog;
mod ids;
mod instrument;
mod report;
mod response;
mod reward;

pub use ids::{
    AssignmentId, InstrumentId, ItemId, OptionId, ParseIdError, ResponseId, SubjectId, TypeTag,
};

pub use instrument::{
    Category, ChoiceOption, Dimension, FeedbackEntry, FeedbackTable, ForcedChoiceSpec, Instrument,
    InstrumentError, Item, ItemBody, PairOption, ScaleRange, ScoringKind, ScoringSpec,
};

pub use answer::{AnswerMap, AnswerValue};
pub use assignment::{Assignment, AssignmentError, AssignmentStatus};
pub use catalog::{CatalogError, InstrumentCatalog};
pub use report::{
    CategoricalScore, CategoryScore, DimensionScore, DimensionalScore, Narrative, ScoreBreakdown,
    ScoredResult, TypeCount, TypeScore,
};
pub use response::{Response, ResponseError};
pub use reward::RewardEntry;
