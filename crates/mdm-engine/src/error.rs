//! Error types for `mdm-engine`.

use std::time::Duration;

use mdm_core::request::RequestId;
use thiserror::Error;

/// A gateway error with its concrete type erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] mdm_core::Error),

  #[error("request {0} not found")]
  NotFound(RequestId),

  #[error("no free request id for {prefix} after {attempts} attempts")]
  IdCollision { prefix: String, attempts: u32 },

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("advisor error: {0}")]
  Advisory(#[from] AdvisoryError),
}

impl Error {
  pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

/// Why an advisory pass (or a status suggestion) produced nothing.
#[derive(Debug, Error)]
pub enum AdvisoryError {
  #[error("advisor call failed: {0}")]
  Gateway(#[source] BoxError),

  #[error("advisor did not answer within {0:?}")]
  Timeout(Duration),

  #[error("advisor returned an empty response")]
  EmptyResponse,

  #[error("unusable status decision: {0}")]
  Decision(#[source] mdm_core::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("request was deleted before the pass ran")]
  RequestGone,

  #[error("could not apply advised transition: {0}")]
  Transition(#[source] Box<Error>),
}

impl AdvisoryError {
  pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
