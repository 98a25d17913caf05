use std::sync::Arc;

use assess_core::Clock;
use assess_core::model::InstrumentCatalog;
use storage::repository::Storage;
use storage::sqlite::SqliteInitError;

use crate::checkpoint::CheckpointPolicy;
use crate::sessions::SessionService;

/// Assembly point wiring the clock, the instrument catalog, and a storage
/// backend into the service layer.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: SessionService,
    pub checkpoints: CheckpointPolicy,
    pub storage: Storage,
}

impl AppServices {
    /// Wire services over an existing storage backend.
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<InstrumentCatalog>, storage: Storage) -> Self {
        let sessions = SessionService::new(clock, catalog, &storage);
        Self {
            sessions,
            checkpoints: CheckpointPolicy::default(),
            storage,
        }
    }

    /// In-memory backend for tests and prototyping.
    #[must_use]
    pub fn in_memory(clock: Clock, catalog: Arc<InstrumentCatalog>) -> Self {
        Self::new(clock, catalog, Storage::in_memory())
    }

    /// `SQLite` backend: connects, migrates, then wires services.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or
    /// migrated.
    pub async fn sqlite(
        database_url: &str,
        clock: Clock,
        catalog: Arc<InstrumentCatalog>,
    ) -> Result<Self, SqliteInitError> {
        let storage = Storage::sqlite(database_url).await?;
        Ok(Self::new(clock, catalog, storage))
    }
}
