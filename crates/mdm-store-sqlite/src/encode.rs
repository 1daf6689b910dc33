//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Enums use their display names.
//! `submitted_data` is stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use mdm_core::{
  request::{Comment, CommentVisibility, HistoryEntry, Request, RequestId},
  status::RequestStatus,
  submission::{Region, RequestType, SubmittedData},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { kind, value: s.to_owned() })
}

pub fn decode_status(s: &str) -> Result<RequestStatus> { decode_enum("status", s) }

pub fn decode_request_type(s: &str) -> Result<RequestType> { decode_enum("request type", s) }

pub fn decode_region(s: &str) -> Result<Region> { decode_enum("region", s) }

pub fn encode_visibility(v: CommentVisibility) -> &'static str {
  match v {
    CommentVisibility::Public => "public",
    CommentVisibility::Internal => "internal",
  }
}

pub fn decode_visibility(s: &str) -> Result<CommentVisibility> {
  match s {
    "public" => Ok(CommentVisibility::Public),
    "internal" => Ok(CommentVisibility::Internal),
    other => Err(Error::UnknownValue { kind: "visibility", value: other.to_owned() }),
  }
}

// ─── SubmittedData ───────────────────────────────────────────────────────────

pub fn encode_submitted_data(data: &SubmittedData) -> Result<String> {
  Ok(serde_json::to_string(data)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `requests` row.
pub struct RawRequest {
  pub request_id:             String,
  pub requester_id:           String,
  pub requester_email:        String,
  pub requester_display_name: String,
  pub request_type:           String,
  pub region:                 String,
  pub status:                 String,
  pub submitted_data:         String,
  pub created_at:             String,
  pub updated_at:             String,
}

/// Raw strings read from a `comments` row.
pub struct RawComment {
  pub visibility:     String,
  pub user_id:        String,
  pub user_name:      String,
  pub text:           String,
  pub is_ai_response: bool,
  pub recorded_at:    String,
}

/// Raw strings read from a `history` row.
pub struct RawHistory {
  pub status:               String,
  pub changed_by_user_id:   String,
  pub changed_by_user_name: String,
  pub recorded_at:          String,
}

/// A request row together with its child rows, already in `seq` order.
pub struct RawDocument {
  pub request:  RawRequest,
  pub comments: Vec<RawComment>,
  pub history:  Vec<RawHistory>,
}

impl RawDocument {
  pub fn into_request(self) -> Result<Request> {
    let RawDocument { request: r, comments: raw_comments, history: raw_history } = self;

    let mut comments = Vec::new();
    let mut internal_comments = Vec::new();
    for raw in raw_comments {
      let visibility = decode_visibility(&raw.visibility)?;
      let comment = Comment {
        user_id:        raw.user_id,
        user_name:      raw.user_name,
        timestamp:      decode_dt(&raw.recorded_at)?,
        text:           raw.text,
        is_ai_response: raw.is_ai_response,
      };
      match visibility {
        CommentVisibility::Public => comments.push(comment),
        CommentVisibility::Internal => internal_comments.push(comment),
      }
    }

    let history = raw_history
      .into_iter()
      .map(|h| {
        Ok(HistoryEntry {
          timestamp:            decode_dt(&h.recorded_at)?,
          status:               decode_status(&h.status)?,
          changed_by_user_id:   h.changed_by_user_id,
          changed_by_user_name: h.changed_by_user_name,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Request {
      id: r.request_id.parse::<RequestId>()?,
      requester_id: r.requester_id,
      requester_email: r.requester_email,
      requester_display_name: r.requester_display_name,
      request_type: decode_request_type(&r.request_type)?,
      region: decode_region(&r.region)?,
      status: decode_status(&r.status)?,
      submitted_data: serde_json::from_str(&r.submitted_data)?,
      comments,
      internal_comments,
      history,
      created_at: decode_dt(&r.created_at)?,
      updated_at: decode_dt(&r.updated_at)?,
    })
  }
}
