//! The `RequestStore` trait and supporting query and change-feed types.
//!
//! The trait is implemented by storage backends (e.g. `mdm-store-sqlite`).
//! The engine and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
  request::{Comment, CommentVisibility, HistoryEntry, Request, RequestId},
  settings::SystemSettings,
  status::RequestStatus,
  submission::{Region, RequestType, SubmittedData},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Field filters for [`RequestStore::query_requests`]. Results are newest
/// first.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
  pub requester_id: Option<String>,
  pub status:       Option<RequestStatus>,
  pub request_type: Option<RequestType>,
  pub region:       Option<Region>,
  /// Restrict to ids issued on one date, given as its `YYYYMMDD` prefix.
  pub date_prefix:  Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// Result of [`RequestStore::create_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
  Created,
  /// A document with the same id already exists; nothing was written.
  AlreadyExists,
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
  Created,
  StatusChanged { status: RequestStatus },
  CommentAdded { visibility: CommentVisibility },
  DataUpdated,
  Deleted,
}

/// Notification pushed to subscribers after a committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestChange {
  pub request_id: RequestId,
  pub change:     ChangeKind,
  pub at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
  #[error("change feed closed")]
  Closed,
  /// The subscriber fell behind and `0` notifications were dropped. Readers
  /// should re-fetch the document.
  #[error("subscriber lagged by {0} changes")]
  Lagged(u64),
}

/// A live feed of request changes, optionally narrowed to one request.
#[derive(Debug)]
pub struct RequestSubscription {
  receiver: broadcast::Receiver<RequestChange>,
  filter:   Option<RequestId>,
}

impl RequestSubscription {
  pub fn new(receiver: broadcast::Receiver<RequestChange>, filter: Option<RequestId>) -> Self {
    Self { receiver, filter }
  }

  /// Wait for the next change that passes the filter.
  pub async fn recv(&mut self) -> Result<RequestChange, SubscriptionError> {
    loop {
      match self.receiver.recv().await {
        Ok(change) => {
          if self.filter.as_ref().is_none_or(|id| *id == change.request_id) {
            return Ok(change);
          }
        }
        Err(broadcast::error::RecvError::Lagged(n)) => return Err(SubscriptionError::Lagged(n)),
        Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
      }
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document store holding requests and settings.
///
/// Comment and history writes are appends; no method removes or rewrites an
/// element of either sequence. Every write refreshes `updated_at` and is
/// announced to subscribers once committed.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks.
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a request by id. Returns `None` if not found.
  fn get_request<'a>(
    &'a self,
    id: &'a RequestId,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + 'a;

  fn query_requests<'a>(
    &'a self,
    query: &'a RequestQuery,
  ) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + 'a;

  /// Count matching requests, ignoring `limit` and `offset`.
  fn count_requests<'a>(
    &'a self,
    query: &'a RequestQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Highest sequence number in use under a `YYYYMMDD` id prefix, or `None`
  /// if no request carries it.
  fn max_sequence<'a>(
    &'a self,
    date_prefix: &'a str,
  ) -> impl Future<Output = Result<Option<u32>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new request, including its initial history. Reports
  /// [`CreateOutcome::AlreadyExists`] instead of overwriting.
  fn create_request<'a>(
    &'a self,
    request: &'a Request,
  ) -> impl Future<Output = Result<CreateOutcome, Self::Error>> + Send + 'a;

  /// Set `status` to `entry.status` and append `entry` to `history` in a
  /// single atomic update. `updated_at` becomes `entry.timestamp`.
  ///
  /// Returns `false` if the request does not exist.
  fn record_transition<'a>(
    &'a self,
    id: &'a RequestId,
    entry: &'a HistoryEntry,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Append `comment` to the thread selected by `visibility`. `updated_at`
  /// becomes `comment.timestamp`.
  ///
  /// Returns `false` if the request does not exist.
  fn append_comment<'a>(
    &'a self,
    id: &'a RequestId,
    visibility: CommentVisibility,
    comment: &'a Comment,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Replace `submitted_data`. Returns `false` if the request does not exist.
  fn update_submitted_data<'a>(
    &'a self,
    id: &'a RequestId,
    data: &'a SubmittedData,
    updated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove the whole document. Returns `false` if it did not exist.
  fn delete_request<'a>(
    &'a self,
    id: &'a RequestId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Settings ──────────────────────────────────────────────────────────

  /// The system settings document, or defaults if none has been saved.
  fn get_settings(&self) -> impl Future<Output = Result<SystemSettings, Self::Error>> + Send + '_;

  fn put_settings(
    &self,
    settings: SystemSettings,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Change feed ───────────────────────────────────────────────────────

  /// Subscribe to committed changes; `Some(id)` narrows the feed to one
  /// request.
  fn subscribe(&self, filter: Option<RequestId>) -> RequestSubscription;
}
