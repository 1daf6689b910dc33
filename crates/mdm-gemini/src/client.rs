//! Async HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use mdm_core::advisor::{Advisor, GenerationConfig};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
  pub api_key:  String,
  pub model:    String,
  pub base_url: String,
}

impl GeminiConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key:  api_key.into(),
      model:    DEFAULT_MODEL.to_owned(),
      base_url: DEFAULT_BASE_URL.to_owned(),
    }
  }
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiAdvisor {
  client: Client,
  config: GeminiConfig,
}

impl GeminiAdvisor {
  pub fn new(config: GeminiConfig) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/models/{}:generateContent",
      self.config.base_url.trim_end_matches('/'),
      self.config.model
    )
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
  contents:          [Content<'a>; 1],
  generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
  parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
  text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
  temperature:       f32,
  top_k:             u32,
  top_p:             f32,
  max_output_tokens: u32,
}

impl<'a> GenerateRequest<'a> {
  fn new(prompt: &'a str, config: GenerationConfig) -> Self {
    Self {
      contents:          [Content { parts: [Part { text: prompt }] }],
      generation_config: WireGenerationConfig {
        temperature:       config.temperature,
        top_k:             config.top_k,
        top_p:             config.top_p,
        max_output_tokens: config.max_output_tokens,
      },
    }
  }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
  text: Option<String>,
}

impl GenerateResponse {
  /// Text of the first part of the first candidate, trimmed.
  fn into_text(self) -> Result<String> {
    self
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .and_then(|p| p.text)
      .map(|t| t.trim().to_owned())
      .filter(|t| !t.is_empty())
      .ok_or(Error::NoCandidate)
  }
}

// ─── Advisor impl ────────────────────────────────────────────────────────────

impl Advisor for GeminiAdvisor {
  type Error = Error;

  async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String> {
    let resp = self
      .client
      .post(self.url())
      .query(&[("key", self.config.api_key.as_str())])
      .json(&GenerateRequest::new(prompt, config))
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      tracing::debug!(%status, model = %self.config.model, "gemini request rejected");
      return Err(Error::Status { status: status.as_u16(), body });
    }

    resp.json::<GenerateResponse>().await?.into_text()
  }
}
