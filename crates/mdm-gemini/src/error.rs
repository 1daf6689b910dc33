//! Error type for `mdm-gemini`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("gemini returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("gemini response contained no candidate text")]
  NoCandidate,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
