//! The request entity, its comments, and its status history.
//!
//! `comments`, `internal_comments` and `history` are append-only. Nothing in
//! this crate removes or rewrites an element once it has been written.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  actor::Actor,
  status::RequestStatus,
  submission::{Region, RequestType, SubmittedData},
};

// ─── RequestId ───────────────────────────────────────────────────────────────

/// Highest daily sequence number representable in the three-digit suffix.
pub const MAX_DAILY_SEQUENCE: u32 = 999;

/// `YYYYMMDDnnn`: an eight-digit date followed by a three-digit daily
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
  /// Build the id for the `sequence`-th request of `date`.
  pub fn new(date: NaiveDate, sequence: u32) -> Result<Self> {
    if sequence == 0 || sequence > MAX_DAILY_SEQUENCE {
      return Err(Error::SequenceExhausted(Self::date_prefix(date)));
    }
    Ok(Self(format!("{}{sequence:03}", Self::date_prefix(date))))
  }

  /// The eight-digit prefix shared by every request created on `date`.
  pub fn date_prefix(date: NaiveDate) -> String { date.format("%Y%m%d").to_string() }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The `YYYYMMDD` part of this id.
  pub fn prefix(&self) -> &str { &self.0[..8] }

  pub fn sequence(&self) -> u32 {
    // Validated as eleven ASCII digits on construction.
    self.0[8..].parse().unwrap_or_default()
  }
}

impl FromStr for RequestId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let well_formed = s.len() == 11
      && s.bytes().all(|b| b.is_ascii_digit())
      && NaiveDate::parse_from_str(&s[..8], "%Y%m%d").is_ok();
    if well_formed {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidRequestId(s.to_owned()))
    }
  }
}

impl TryFrom<String> for RequestId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<RequestId> for String {
  fn from(id: RequestId) -> Self { id.0 }
}

impl fmt::Display for RequestId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// Which comment thread an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentVisibility {
  /// Visible to the requester.
  Public,
  /// Staff only.
  Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub user_id:        String,
  pub user_name:      String,
  pub timestamp:      DateTime<Utc>,
  pub text:           String,
  #[serde(default)]
  pub is_ai_response: bool,
}

/// One status transition in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub timestamp:            DateTime<Utc>,
  pub status:               RequestStatus,
  pub changed_by_user_id:   String,
  pub changed_by_user_name: String,
}

impl HistoryEntry {
  pub fn by(actor: &Actor, status: RequestStatus, timestamp: DateTime<Utc>) -> Self {
    Self {
      timestamp,
      status,
      changed_by_user_id: actor.user_id.clone(),
      changed_by_user_name: actor.name().to_owned(),
    }
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  pub id:                     RequestId,
  pub requester_id:           String,
  pub requester_email:        String,
  pub requester_display_name: String,
  pub request_type:           RequestType,
  pub region:                 Region,
  pub status:                 RequestStatus,
  pub submitted_data:         SubmittedData,
  pub comments:               Vec<Comment>,
  pub internal_comments:      Vec<Comment>,
  pub history:                Vec<HistoryEntry>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

impl Request {
  /// A freshly submitted request with its initial history entry.
  pub fn submitted(
    id: RequestId,
    requester: &Actor,
    request_type: RequestType,
    region: Region,
    submitted_data: SubmittedData,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id,
      requester_id: requester.user_id.clone(),
      requester_email: requester.email.clone(),
      requester_display_name: requester.name().to_owned(),
      request_type,
      region,
      status: RequestStatus::Submitted,
      submitted_data,
      comments: Vec::new(),
      internal_comments: Vec::new(),
      history: vec![HistoryEntry::by(requester, RequestStatus::Submitted, now)],
      created_at: now,
      updated_at: now,
    }
  }

  pub fn is_owned_by(&self, actor: &Actor) -> bool { self.requester_id == actor.user_id }

  pub fn thread(&self, visibility: CommentVisibility) -> &[Comment] {
    match visibility {
      CommentVisibility::Public => &self.comments,
      CommentVisibility::Internal => &self.internal_comments,
    }
  }

  /// Every distinct region carried by the submitted data.
  pub fn regions(&self) -> Vec<Region> { self.submitted_data.regions() }

  pub fn last_history(&self) -> Option<&HistoryEntry> { self.history.last() }

  /// The requester-facing view: internal comments removed.
  pub fn redacted_for_requester(mut self) -> Self {
    self.internal_comments.clear();
    self
  }
}

/// Input to request creation. `region` falls back to the first record's
/// region when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
  pub request_type:   RequestType,
  pub region:         Option<Region>,
  pub submitted_data: SubmittedData,
}
