pub mod store;
pub mod types;

pub use store::{AuditError, AuditErrorKind, AuditStore};
pub use types::{CrisisEvent, CrisisEventDraft, ReviewerStatus};
