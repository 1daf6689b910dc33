//! [`SqliteStore`]: the SQLite implementation of [`RequestStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;

use mdm_core::{
  request::{Comment, CommentVisibility, HistoryEntry, Request, RequestId},
  settings::SystemSettings,
  store::{
    ChangeKind, CreateOutcome, RequestChange, RequestQuery, RequestStore, RequestSubscription,
  },
  submission::SubmittedData,
};

use crate::{
  Result,
  encode::{
    RawComment, RawDocument, RawHistory, RawRequest, encode_dt, encode_submitted_data,
    encode_visibility,
  },
  schema::SCHEMA,
};

/// Buffered notifications per subscriber before it is reported as lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Name of the single settings document.
const SETTINGS_DOCUMENT: &str = "system";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An MDM request store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection and change feed are
/// reference-counted, and clones share both.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  changes: broadcast::Sender<RequestChange>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
    Ok(Self { conn, changes })
  }

  fn publish(&self, request_id: &RequestId, change: ChangeKind, at: DateTime<Utc>) {
    tracing::trace!(request_id = %request_id, ?change, "publishing change");
    // Having no subscribers is the normal case.
    let _ = self.changes.send(RequestChange {
      request_id: request_id.clone(),
      change,
      at,
    });
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn load_document(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawDocument>> {
  let request = conn
    .query_row(
      "SELECT request_id, requester_id, requester_email, requester_display_name,
              request_type, region, status, submitted_data, created_at, updated_at
       FROM requests WHERE request_id = ?1",
      rusqlite::params![id],
      |row| {
        Ok(RawRequest {
          request_id:             row.get(0)?,
          requester_id:           row.get(1)?,
          requester_email:        row.get(2)?,
          requester_display_name: row.get(3)?,
          request_type:           row.get(4)?,
          region:                 row.get(5)?,
          status:                 row.get(6)?,
          submitted_data:         row.get(7)?,
          created_at:             row.get(8)?,
          updated_at:             row.get(9)?,
        })
      },
    )
    .optional()?;

  let Some(request) = request else {
    return Ok(None);
  };

  let comments = conn
    .prepare(
      "SELECT visibility, user_id, user_name, text, is_ai_response, recorded_at
       FROM comments WHERE request_id = ?1 ORDER BY seq",
    )?
    .query_map(rusqlite::params![id], |row| {
      Ok(RawComment {
        visibility:     row.get(0)?,
        user_id:        row.get(1)?,
        user_name:      row.get(2)?,
        text:           row.get(3)?,
        is_ai_response: row.get(4)?,
        recorded_at:    row.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let history = conn
    .prepare(
      "SELECT status, changed_by_user_id, changed_by_user_name, recorded_at
       FROM history WHERE request_id = ?1 ORDER BY seq",
    )?
    .query_map(rusqlite::params![id], |row| {
      Ok(RawHistory {
        status:               row.get(0)?,
        changed_by_user_id:   row.get(1)?,
        changed_by_user_name: row.get(2)?,
        recorded_at:          row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawDocument { request, comments, history }))
}

fn insert_history(
  conn: &rusqlite::Connection,
  id: &str,
  entry: &EncodedHistory,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO history (request_id, status, changed_by_user_id, changed_by_user_name, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![id, entry.status, entry.user_id, entry.user_name, entry.recorded_at],
  )?;
  Ok(())
}

fn insert_comment(
  conn: &rusqlite::Connection,
  id: &str,
  comment: &EncodedComment,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO comments (request_id, visibility, user_id, user_name, text, is_ai_response, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      id,
      comment.visibility,
      comment.user_id,
      comment.user_name,
      comment.text,
      comment.is_ai_response,
      comment.recorded_at,
    ],
  )?;
  Ok(())
}

/// Owned column values for a history row, movable onto the connection thread.
struct EncodedHistory {
  status:      &'static str,
  user_id:     String,
  user_name:   String,
  recorded_at: String,
}

impl From<&HistoryEntry> for EncodedHistory {
  fn from(entry: &HistoryEntry) -> Self {
    Self {
      status:      entry.status.as_str(),
      user_id:     entry.changed_by_user_id.clone(),
      user_name:   entry.changed_by_user_name.clone(),
      recorded_at: encode_dt(entry.timestamp),
    }
  }
}

struct EncodedComment {
  visibility:     &'static str,
  user_id:        String,
  user_name:      String,
  text:           String,
  is_ai_response: bool,
  recorded_at:    String,
}

impl EncodedComment {
  fn new(visibility: CommentVisibility, comment: &Comment) -> Self {
    Self {
      visibility:     encode_visibility(visibility),
      user_id:        comment.user_id.clone(),
      user_name:      comment.user_name.clone(),
      text:           comment.text.clone(),
      is_ai_response: comment.is_ai_response,
      recorded_at:    encode_dt(comment.timestamp),
    }
  }
}

/// Owned filter values shared by the list and count queries.
struct EncodedQuery {
  requester_id: Option<String>,
  status:       Option<&'static str>,
  request_type: Option<String>,
  region:       Option<String>,
  date_prefix:  Option<String>,
  limit:        i64,
  offset:       i64,
}

impl From<&RequestQuery> for EncodedQuery {
  fn from(q: &RequestQuery) -> Self {
    Self {
      requester_id: q.requester_id.clone(),
      status:       q.status.map(|s| s.as_str()),
      request_type: q.request_type.map(|t| t.to_string()),
      region:       q.region.map(|r| r.to_string()),
      date_prefix:  q.date_prefix.clone(),
      // SQLite treats a negative LIMIT as "no limit".
      limit:        q.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX)),
      offset:       q.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX)),
    }
  }
}

const FILTER_CLAUSE: &str = "
  (?1 IS NULL OR requester_id = ?1)
  AND (?2 IS NULL OR status = ?2)
  AND (?3 IS NULL OR request_type = ?3)
  AND (?4 IS NULL OR region = ?4)
  AND (?5 IS NULL OR id_prefix = ?5)";

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = crate::Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_request(&self, id: &RequestId) -> Result<Option<Request>> {
    let id_str = id.to_string();
    let raw = self
      .conn
      .call(move |conn| Ok(load_document(conn, &id_str)?))
      .await?;
    raw.map(RawDocument::into_request).transpose()
  }

  async fn query_requests(&self, query: &RequestQuery) -> Result<Vec<Request>> {
    let q = EncodedQuery::from(query);

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT request_id FROM requests WHERE {FILTER_CLAUSE}
           ORDER BY created_at DESC, request_id DESC
           LIMIT ?6 OFFSET ?7"
        );
        let ids = conn
          .prepare(&sql)?
          .query_map(
            rusqlite::params![
              q.requester_id,
              q.status,
              q.request_type,
              q.region,
              q.date_prefix,
              q.limit,
              q.offset,
            ],
            |row| row.get::<_, String>(0),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(doc) = load_document(conn, &id)? {
            docs.push(doc);
          }
        }
        Ok(docs)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_request).collect()
  }

  async fn count_requests(&self, query: &RequestQuery) -> Result<usize> {
    let q = EncodedQuery::from(query);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM requests WHERE {FILTER_CLAUSE}");
        Ok(conn.query_row(
          &sql,
          rusqlite::params![q.requester_id, q.status, q.request_type, q.region, q.date_prefix],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(usize::try_from(count).unwrap_or_default())
  }

  async fn max_sequence(&self, date_prefix: &str) -> Result<Option<u32>> {
    let prefix = date_prefix.to_owned();

    // Ids are fixed-width digits, so the text maximum is the numeric one.
    let highest: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(request_id) FROM requests WHERE id_prefix = ?1",
          [prefix],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(highest.map(|raw| raw.parse::<RequestId>()).transpose()?.map(|id| id.sequence()))
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create_request(&self, request: &Request) -> Result<CreateOutcome> {
    let id_str         = request.id.to_string();
    let prefix         = request.id.prefix().to_owned();
    let requester_id   = request.requester_id.clone();
    let requester_mail = request.requester_email.clone();
    let requester_name = request.requester_display_name.clone();
    let request_type   = request.request_type.to_string();
    let region         = request.region.to_string();
    let status         = request.status.as_str();
    let data_json      = encode_submitted_data(&request.submitted_data)?;
    let created_at     = encode_dt(request.created_at);
    let updated_at     = encode_dt(request.updated_at);
    let history: Vec<EncodedHistory> = request.history.iter().map(EncodedHistory::from).collect();
    let comments: Vec<EncodedComment> = request
      .comments
      .iter()
      .map(|c| EncodedComment::new(CommentVisibility::Public, c))
      .chain(
        request
          .internal_comments
          .iter()
          .map(|c| EncodedComment::new(CommentVisibility::Internal, c)),
      )
      .collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO requests (
             request_id, id_prefix, requester_id, requester_email, requester_display_name,
             request_type, region, status, submitted_data, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            prefix,
            requester_id,
            requester_mail,
            requester_name,
            request_type,
            region,
            status,
            data_json,
            created_at,
            updated_at,
          ],
        )?;
        if inserted == 0 {
          return Ok(CreateOutcome::AlreadyExists);
        }
        for entry in &history {
          insert_history(&tx, &id_str, entry)?;
        }
        for comment in &comments {
          insert_comment(&tx, &id_str, comment)?;
        }
        tx.commit()?;
        Ok(CreateOutcome::Created)
      })
      .await?;

    if outcome == CreateOutcome::Created {
      self.publish(&request.id, ChangeKind::Created, request.created_at);
    }
    Ok(outcome)
  }

  async fn record_transition(&self, id: &RequestId, entry: &HistoryEntry) -> Result<bool> {
    let id_str  = id.to_string();
    let encoded = EncodedHistory::from(entry);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE requests SET status = ?2, updated_at = ?3 WHERE request_id = ?1",
          rusqlite::params![id_str, encoded.status, encoded.recorded_at],
        )?;
        if updated == 0 {
          return Ok(false);
        }
        insert_history(&tx, &id_str, &encoded)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found {
      self.publish(id, ChangeKind::StatusChanged { status: entry.status }, entry.timestamp);
    }
    Ok(found)
  }

  async fn append_comment(
    &self,
    id: &RequestId,
    visibility: CommentVisibility,
    comment: &Comment,
  ) -> Result<bool> {
    let id_str  = id.to_string();
    let encoded = EncodedComment::new(visibility, comment);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE requests SET updated_at = ?2 WHERE request_id = ?1",
          rusqlite::params![id_str, encoded.recorded_at],
        )?;
        if updated == 0 {
          return Ok(false);
        }
        insert_comment(&tx, &id_str, &encoded)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found {
      self.publish(id, ChangeKind::CommentAdded { visibility }, comment.timestamp);
    }
    Ok(found)
  }

  async fn update_submitted_data(
    &self,
    id: &RequestId,
    data: &SubmittedData,
    updated_at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str    = id.to_string();
    let data_json = encode_submitted_data(data)?;
    let at_str    = encode_dt(updated_at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE requests SET submitted_data = ?2, updated_at = ?3 WHERE request_id = ?1",
          rusqlite::params![id_str, data_json, at_str],
        )?)
      })
      .await?;

    let found = updated > 0;
    if found {
      self.publish(id, ChangeKind::DataUpdated, updated_at);
    }
    Ok(found)
  }

  async fn delete_request(&self, id: &RequestId) -> Result<bool> {
    let id_str = id.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM requests WHERE request_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    let found = deleted > 0;
    if found {
      self.publish(id, ChangeKind::Deleted, Utc::now());
    }
    Ok(found)
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_settings(&self) -> Result<SystemSettings> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT value_json FROM settings WHERE name = ?1",
            rusqlite::params![SETTINGS_DOCUMENT],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    match raw {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(SystemSettings::default()),
    }
  }

  async fn put_settings(&self, settings: SystemSettings) -> Result<()> {
    let json   = serde_json::to_string(&settings)?;
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (name, value_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(name) DO UPDATE SET value_json = excluded.value_json,
                                           updated_at = excluded.updated_at",
          rusqlite::params![SETTINGS_DOCUMENT, json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Change feed ───────────────────────────────────────────────────────────

  fn subscribe(&self, filter: Option<RequestId>) -> RequestSubscription {
    RequestSubscription::new(self.changes.subscribe(), filter)
  }
}
