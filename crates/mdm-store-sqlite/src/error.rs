//! Error type for `mdm-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mdm_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored discriminant no longer maps to a known enum variant.
  #[error("unknown {kind} value: {value:?}")]
  UnknownValue { kind: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
