//! Pure lifecycle rules: who may do what to a request, and what record each
//! permitted action produces.
//!
//! Nothing here touches storage. The engine evaluates these rules against the
//! current document, then hands the resulting record to the store.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  actor::{ASSISTANT_COMMENT_NAME, ASSISTANT_USER_ID, Actor},
  request::{Comment, CommentVisibility, HistoryEntry, Request},
  settings::SubmissionSettings,
  status::{RequestStatus, TerminalPolicy},
  submission::{RequestType, SubmittedData},
};

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Decide the history entry a transition to `new_status` would append.
///
/// Returns `Ok(None)` when `new_status` equals the current status; no entry
/// may be written in that case.
pub fn plan_transition(
  request: &Request,
  new_status: RequestStatus,
  actor: &Actor,
  policy: TerminalPolicy,
  now: DateTime<Utc>,
) -> Result<Option<HistoryEntry>> {
  actor.validate()?;
  if !(actor.is_staff() || actor.is_assistant()) {
    return Err(Error::Forbidden(format!(
      "{} may not change the status of request {}",
      actor.role, request.id
    )));
  }
  if new_status == request.status {
    return Ok(None);
  }
  if policy == TerminalPolicy::Locked && request.status.is_terminal() {
    return Err(Error::TerminalStatus(request.status));
  }
  Ok(Some(HistoryEntry::by(actor, new_status, now)))
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// Build a human comment. Blank text is rejected; surrounding whitespace is
/// trimmed.
pub fn new_comment(author: &Actor, text: &str, now: DateTime<Utc>) -> Result<Comment> {
  author.validate()?;
  let text = text.trim();
  if text.is_empty() {
    return Err(Error::BlankComment);
  }
  Ok(Comment {
    user_id:        author.user_id.clone(),
    user_name:      author.name().to_owned(),
    timestamp:      now,
    text:           text.to_owned(),
    is_ai_response: false,
  })
}

/// A comment authored by the advisor.
pub fn assistant_comment(text: &str, now: DateTime<Utc>) -> Comment {
  Comment {
    user_id:        ASSISTANT_USER_ID.to_owned(),
    user_name:      ASSISTANT_COMMENT_NAME.to_owned(),
    timestamp:      now,
    text:           text.trim().to_owned(),
    is_ai_response: true,
  }
}

/// The internal note announcing an advisor-applied status change.
pub fn status_change_note(status: RequestStatus, reason: &str) -> String {
  format!("I've updated the status to {status}. Reason: {reason}")
}

// ─── Authorization ───────────────────────────────────────────────────────────

pub fn authorize_read(request: &Request, actor: &Actor) -> Result<()> {
  if actor.is_staff() || actor.is_assistant() || request.is_owned_by(actor) {
    Ok(())
  } else {
    Err(Error::Forbidden(format!("request {} belongs to another user", request.id)))
  }
}

pub fn authorize_comment(
  request: &Request,
  actor: &Actor,
  visibility: CommentVisibility,
) -> Result<()> {
  let allowed = match visibility {
    CommentVisibility::Public => actor.is_staff() || request.is_owned_by(actor),
    CommentVisibility::Internal => actor.is_staff(),
  };
  if allowed {
    Ok(())
  } else {
    Err(Error::Forbidden(format!(
      "{} may not post {visibility:?} comments on request {}",
      actor.role, request.id
    )))
  }
}

/// Only the requester may edit, and only while the request is `Submitted`.
pub fn authorize_edit(request: &Request, actor: &Actor) -> Result<()> {
  if !request.is_owned_by(actor) {
    return Err(Error::Forbidden(format!(
      "only the requester may edit request {}",
      request.id
    )));
  }
  if request.status != RequestStatus::Submitted {
    return Err(Error::NotEditable(request.status));
  }
  Ok(())
}

// ─── Submissions ─────────────────────────────────────────────────────────────

/// Check a payload against its request type and the bulk-submission limits.
pub fn validate_submission(
  request_type: RequestType,
  data: &SubmittedData,
  settings: &SubmissionSettings,
) -> Result<()> {
  data.ensure_matches(request_type)?;
  if data.is_bulk() {
    if !settings.allow_bulk_requests {
      return Err(Error::BulkDisabled);
    }
    if data.is_empty() {
      return Err(Error::EmptyBulk);
    }
    if data.len() > settings.max_bulk_request_size {
      return Err(Error::BulkTooLarge {
        size: data.len(),
        max:  settings.max_bulk_request_size,
      });
    }
  }
  Ok(())
}
