//! Server configuration, read from `config.toml` and `MDM_*` environment
//! variables.

use std::{path::PathBuf, time::Duration};

use mdm_core::status::TerminalPolicy;
use mdm_engine::EngineConfig;
use mdm_gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Unset means every advisor call fails; the portal still works without
  /// AI replies.
  pub gemini_api_key:       Option<String>,
  pub gemini_model:         String,
  pub gemini_base_url:      String,
  pub advisory_delay_ms:    u64,
  pub advisor_timeout_secs: u64,
  pub terminal_policy:      TerminalPolicy,
  pub max_id_attempts:      u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let engine = EngineConfig::default();
    Self {
      host:                 "127.0.0.1".to_owned(),
      port:                 8080,
      store_path:           PathBuf::from("~/.local/share/mdm-portal/requests.db"),
      gemini_api_key:       None,
      gemini_model:         DEFAULT_MODEL.to_owned(),
      gemini_base_url:      DEFAULT_BASE_URL.to_owned(),
      advisory_delay_ms:    u64::try_from(engine.advisory_delay.as_millis()).unwrap_or(u64::MAX),
      advisor_timeout_secs: engine.advisor_timeout.as_secs(),
      terminal_policy:      engine.terminal_policy,
      max_id_attempts:      engine.max_id_attempts,
    }
  }
}

impl ServerConfig {
  pub fn engine(&self) -> EngineConfig {
    EngineConfig {
      advisory_delay:  Duration::from_millis(self.advisory_delay_ms),
      advisor_timeout: Duration::from_secs(self.advisor_timeout_secs),
      terminal_policy: self.terminal_policy,
      max_id_attempts: self.max_id_attempts.max(1),
    }
  }

  pub fn gemini(&self) -> GeminiConfig {
    GeminiConfig {
      api_key:  self.gemini_api_key.clone().unwrap_or_default(),
      model:    self.gemini_model.clone(),
      base_url: self.gemini_base_url.clone(),
    }
  }
}
