//! The identity performing an operation.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

/// Reserved user id for comments and history written by the AI advisor.
pub const ASSISTANT_USER_ID: &str = "ai-assistant";
/// Author name on AI-written comments.
pub const ASSISTANT_COMMENT_NAME: &str = "MDM Assistant";
/// Actor name recorded in history for AI-initiated transitions.
pub const ASSISTANT_ACTOR_NAME: &str = "MDM Assistant (AI)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
  /// Submits and follows their own requests.
  Controller,
  /// MDM team member; triages every request.
  Mdm,
  /// MDM staff with settings and delete rights.
  Administrator,
  /// The AI advisor. Never issued to a signed-in user.
  Assistant,
}

impl UserRole {
  pub fn is_staff(self) -> bool { matches!(self, Self::Mdm | Self::Administrator) }
}

/// Who is acting. Supplied by the identity provider for humans, or built with
/// [`Actor::assistant`] for the advisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id:      String,
  pub email:        String,
  pub display_name: Option<String>,
  pub role:         UserRole,
}

impl Actor {
  /// The identity used for every advisor-initiated write.
  pub fn assistant() -> Self {
    Self {
      user_id:      ASSISTANT_USER_ID.to_owned(),
      email:        String::new(),
      display_name: Some(ASSISTANT_ACTOR_NAME.to_owned()),
      role:         UserRole::Assistant,
    }
  }

  /// Display name if set and non-blank, otherwise the email.
  pub fn name(&self) -> &str {
    match self.display_name.as_deref().map(str::trim) {
      Some(name) if !name.is_empty() => name,
      _ => self.email.trim(),
    }
  }

  pub fn is_staff(&self) -> bool { self.role.is_staff() }

  pub fn is_admin(&self) -> bool { self.role == UserRole::Administrator }

  pub fn is_assistant(&self) -> bool { self.role == UserRole::Assistant }

  /// Reject actors without an id or any usable name.
  pub fn validate(&self) -> Result<()> {
    if self.user_id.trim().is_empty() {
      return Err(Error::MissingActorId);
    }
    if self.name().is_empty() {
      return Err(Error::MissingActorName);
    }
    Ok(())
  }
}
