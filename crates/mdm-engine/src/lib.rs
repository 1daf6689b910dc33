//! The request lifecycle engine.
//!
//! [`LifecycleEngine`] owns every mutation of a request: creation with a
//! daily `YYYYMMDDnnn` id, status transitions with their audit trail,
//! comments, and the delayed AI advisory pass that a comment may trigger.
//! Storage and text generation are injected through the
//! [`RequestStore`](mdm_core::store::RequestStore) and
//! [`Advisor`](mdm_core::advisor::Advisor) traits.

pub mod clock;
pub mod config;
mod engine;
pub mod error;
pub mod prompt;
pub mod tasks;

pub use config::EngineConfig;
pub use engine::{AdvisoryTrigger, CommentReceipt, LifecycleEngine, PassReport, TransitionOutcome};
pub use error::{AdvisoryError, Error, Result};

#[cfg(test)]
mod tests;
