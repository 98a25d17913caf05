//! Application services over the domain and storage layers: the session
//! manager, the completion coordinator, and the autosave policy.

#![forbid(unsafe_code)]

pub mod app;
pub mod checkpoint;
pub mod error;
pub mod sessions;

pub use app::AppServices;
pub use error::SessionError;
pub use sessions::{CompletionService, InProgressSession, SaveOutcome, SessionService, StoredResult};
