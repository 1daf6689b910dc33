//! Error types for `mdm-core`.

use thiserror::Error;

use crate::{status::RequestStatus, submission::RequestType};

#[derive(Debug, Error)]
pub enum Error {
  #[error("comment text must not be blank")]
  BlankComment,

  #[error("actor is missing a user id")]
  MissingActorId,

  #[error("actor is missing a display name and email")]
  MissingActorName,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("request is {0} and no longer accepts status changes")]
  TerminalStatus(RequestStatus),

  #[error("request is {0}; submitted data can only be edited while Submitted")]
  NotEditable(RequestStatus),

  #[error("submitted data of kind {found:?} does not match request type {expected}")]
  DataTypeMismatch {
    expected: RequestType,
    found:    &'static str,
  },

  #[error("bulk submissions are disabled")]
  BulkDisabled,

  #[error("bulk submission must contain at least one row")]
  EmptyBulk,

  #[error("bulk submission has {size} rows; the limit is {max}")]
  BulkTooLarge { size: usize, max: usize },

  #[error("invalid request id: {0:?}")]
  InvalidRequestId(String),

  #[error("daily sequence exhausted for {0}")]
  SequenceExhausted(String),

  #[error("advisor response contains no JSON object")]
  NoJsonObject,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
