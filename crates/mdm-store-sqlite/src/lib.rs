//! SQLite backend for the MDM request store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Committed writes are fanned out to
//! subscribers over a [`tokio::sync::broadcast`] channel.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
