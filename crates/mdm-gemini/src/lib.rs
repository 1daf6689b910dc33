//! [`Advisor`](mdm_core::advisor::Advisor) implementation backed by the
//! Gemini `generateContent` REST endpoint.

mod client;
pub mod error;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiAdvisor, GeminiConfig};
pub use error::{Error, Result};
