use std::collections::HashMap;
use thiserror::Error;

use crate::model::ids::InstrumentId;
use crate::model::instrument::Instrument;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate instrument id: {0}")]
    DuplicateInstrument(InstrumentId),
}

/// Read-only registry of instruments, built once at process start from the
/// configuration collaborator and shared for the lifetime of the process.
///
/// Lookups are always by specific instrument id, never by scoring kind, so
/// a subject can have instruments of the same kind in progress at once.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    by_id: HashMap<InstrumentId, Instrument>,
}

impl InstrumentCatalog {
    /// Build a catalog from pre-validated instruments.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateInstrument` if two instruments share
    /// an id.
    pub fn from_instruments(
        instruments: impl IntoIterator<Item = Instrument>,
    ) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::new();
        for instrument in instruments {
            let id = instrument.id();
            if by_id.insert(id, instrument).is_some() {
                return Err(CatalogError::DuplicateInstrument(id));
            }
        }
        Ok(Self { by_id })
    }

    #[must_use]
    pub fn get(&self, id: InstrumentId) -> Option<&Instrument> {
        self.by_id.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = InstrumentId> + '_ {
        self.by_id.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::instrument::{
        Category, ChoiceOption, FeedbackTable, Item, ItemBody, ScoringSpec,
    };
    use crate::model::{ItemId, OptionId};

    fn instrument(id: u64) -> Instrument {
        Instrument::new(
            InstrumentId::new(id),
            format!("Instrument {id}"),
            ScoringSpec::Categorical {
                categories: vec![Category {
                    key: "a".into(),
                    label: "A".into(),
                }],
            },
            vec![Item {
                id: ItemId::new(1),
                prompt: "Q".into(),
                body: ItemBody::Choice {
                    options: vec![ChoiceOption {
                        id: OptionId::new(1),
                        label: "a".into(),
                        category: "a".into(),
                    }],
                },
            }],
            FeedbackTable::default(),
        )
        .unwrap()
    }

    #[test]
    fn looks_up_by_id() {
        let catalog = InstrumentCatalog::from_instruments([instrument(1), instrument(2)]).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get(InstrumentId::new(2)).is_some());
        assert!(catalog.get(InstrumentId::new(3)).is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err =
            InstrumentCatalog::from_instruments([instrument(1), instrument(1)]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateInstrument(InstrumentId::new(1)));
    }
}
