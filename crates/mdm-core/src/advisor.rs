//! The generative advisor gateway and the structured decision it returns.
//!
//! The advisor is an external, fallible text service. Its raw output is never
//! trusted: the status decision is cut out of whatever prose surrounds it and
//! validated against a strict schema before any field is read.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, status::RequestStatus};

/// Reason recorded when the advisor asks for a change without saying why.
pub const DEFAULT_DECISION_REASON: &str = "AI recommended status update";

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationConfig {
  pub temperature:       f32,
  pub max_output_tokens: u32,
  pub top_k:             u32,
  pub top_p:             f32,
}

impl GenerationConfig {
  pub const fn new(temperature: f32, max_output_tokens: u32) -> Self {
    Self { temperature, max_output_tokens, top_k: 40, top_p: 0.95 }
  }

  /// Short requester-facing reply.
  pub const PUBLIC_REPLY: Self = Self::new(0.2, 200);
  /// Longer staff-facing reply with next steps.
  pub const INTERNAL_REPLY: Self = Self::new(0.3, 300);
  /// Structured status recommendation.
  pub const STATUS_ADVISORY: Self = Self::new(0.1, 500);
}

/// Abstraction over a generative text backend.
pub trait Advisor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Generate a completion for `prompt`, returning the raw text.
  fn generate<'a>(
    &'a self,
    prompt: &'a str,
    config: GenerationConfig,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}

// ─── Status decision ─────────────────────────────────────────────────────────

/// The advisor's answer to "should this request change status?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDecision {
  pub should_update: bool,
  #[serde(default)]
  pub new_status:    Option<RequestStatus>,
  #[serde(default)]
  pub reason:        Option<String>,
}

impl StatusDecision {
  /// Parse a raw completion. Fails if no JSON object is present, or if the
  /// object does not match the schema (wrong types, unknown status names).
  pub fn from_completion(raw: &str) -> Result<Self> {
    let json = extract_json_object(raw).ok_or(Error::NoJsonObject)?;
    Ok(serde_json::from_str(json)?)
  }

  /// The status to move to, if the decision asks for a change away from
  /// `current`.
  pub fn target(&self, current: RequestStatus) -> Option<RequestStatus> {
    match self.new_status {
      Some(status) if self.should_update && status != current => Some(status),
      _ => None,
    }
  }

  /// The stated reason, or a generic one if the advisor left it blank.
  pub fn reason(&self) -> &str {
    match self.reason.as_deref().map(str::trim) {
      Some(r) if !r.is_empty() => r,
      _ => DEFAULT_DECISION_REASON,
    }
  }
}

/// The slice from the first `{` to the last `}`, if both exist in order.
pub fn extract_json_object(raw: &str) -> Option<&str> {
  let start = raw.find('{')?;
  let end = raw.rfind('}')?;
  (start < end).then(|| &raw[start..=end])
}
