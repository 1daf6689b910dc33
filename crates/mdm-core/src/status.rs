//! The request status set and the policy governing terminal states.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The lifecycle stage of a request.
///
/// `Submitted` is the only initial state. `Completed` and `Rejected` are
/// terminal in intent; whether they are enforced as terminal is decided by
/// [`TerminalPolicy`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
pub enum RequestStatus {
  Submitted,
  InProgress,
  PendingInfo,
  #[serde(rename = "ForwardedToSD")]
  #[strum(serialize = "ForwardedToSD")]
  ForwardedToSd,
  Completed,
  Rejected,
}

impl RequestStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Rejected)
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

/// Whether `Completed` / `Rejected` may be left again once reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalPolicy {
  /// Any authorised actor may move a request out of a terminal state.
  #[default]
  Reversible,
  /// Transitions out of a terminal state are rejected.
  Locked,
}
