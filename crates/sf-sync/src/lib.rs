//! Bidirectional sync engine and conflict resolver for tracker entities.

pub mod conflict;
pub mod engine;
pub mod error;
pub mod hash;

pub use engine::{dto_to_domain, ConsistencyReport, FieldInconsistency, SyncEngine};
pub use error::{Result, SyncError};
