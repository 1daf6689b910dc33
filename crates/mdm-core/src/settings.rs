//! The system settings document.
//!
//! Fetched once per operation and passed explicitly to the engine. A missing
//! document or missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

/// Toggles for the AI advisory pass. All off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorySettings {
  /// Reply to public comments.
  pub enable_ai_replies:          bool,
  /// Reply to internal comments.
  pub enable_ai_internal_replies: bool,
  /// After an internal reply, let the advisor change the status.
  pub enable_ai_task_completion:  bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
  pub allow_bulk_requests:   bool,
  pub max_bulk_request_size: usize,
}

impl Default for SubmissionSettings {
  fn default() -> Self {
    Self {
      allow_bulk_requests:   true,
      max_bulk_request_size: 50,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
  pub advisory:   AdvisorySettings,
  pub submission: SubmissionSettings,
}
