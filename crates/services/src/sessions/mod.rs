//! The session manager and completion coordinator.

mod completion;
mod service;
mod view;

pub use completion::{COMPLETION_POINTS, CompletionService};
pub use service::SessionService;
pub use view::{InProgressSession, SaveOutcome, StoredResult};
