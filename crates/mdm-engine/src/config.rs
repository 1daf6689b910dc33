//! Static engine behaviour, fixed at startup.

use std::time::Duration;

use mdm_core::status::TerminalPolicy;

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Wait between a comment and the advisory pass it triggers.
  pub advisory_delay:  Duration,
  /// Upper bound on a single advisor call.
  pub advisor_timeout: Duration,
  pub terminal_policy: TerminalPolicy,
  /// How many ids `create_request` tries before giving up on a collision.
  pub max_id_attempts: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      advisory_delay:  Duration::from_millis(2000),
      advisor_timeout: Duration::from_secs(15),
      terminal_policy: TerminalPolicy::default(),
      max_id_attempts: 5,
    }
  }
}
