//! Error taxonomy: configuration (fatal at startup), profile validation (field level),
//! model client failures, the coarse generation failure seen by callers, and export.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing API credential: set GEMINI_API_KEY (or API_KEY)")]
  MissingApiKey,

  #[error("invalid value for {var}: {value:?}")]
  InvalidEnv { var: &'static str, value: String },

  #[error("failed to read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: toml::de::Error,
  },

  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[from] reqwest::Error),
}

/// One rejected profile field, reported back to the form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

#[derive(Debug, Error)]
#[error("invalid profile: {}", summarize(.0))]
pub struct ProfileRejected(pub Vec<FieldError>);

fn summarize(errors: &[FieldError]) -> String {
  errors
    .iter()
    .map(|e| format!("{}: {}", e.field, e.message))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Failure of a single call to the text or image model.
#[derive(Debug, Error)]
pub enum ClientError {
  #[error("network error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("service rejected the request (HTTP {status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("service returned no content{}", fmt_reason(.reason))]
  Empty { reason: Option<String> },

  #[error("malformed JSON from model: {0}")]
  MalformedJson(#[from] serde_json::Error),

  #[error("response does not match schema: {}", join_problems(.0))]
  SchemaMismatch(Vec<String>),

  #[error("no image returned for prompt {prompt:?}")]
  NoImage { prompt: String },
}

fn join_problems(problems: &[String]) -> String {
  problems.join("; ")
}

fn fmt_reason(reason: &Option<String>) -> String {
  reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default()
}

/// The single coarse condition surfaced to callers when a run fails.
/// The underlying cause stays reachable through `source()` for logs.
#[derive(Debug, Error)]
#[error("content generation failed; please try again")]
pub struct GenerationFailed {
  #[source]
  pub cause: ClientError,
}

impl From<ClientError> for GenerationFailed {
  fn from(cause: ClientError) -> Self {
    Self { cause }
  }
}

/// Outcome of a workshop request that did not produce content.
#[derive(Debug, Error)]
pub enum WorkshopError {
  #[error(transparent)]
  Invalid(#[from] ProfileRejected),

  #[error(transparent)]
  Failed(#[from] GenerationFailed),
}

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("image {which} is not valid base64: {source}")]
  ImageEncoding {
    which: String,
    #[source]
    source: base64::DecodeError,
  },

  #[error("image {which} could not be decoded: {message}")]
  ImageDecode { which: String, message: String },

  #[error("failed to write PDF: {0}")]
  Pdf(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_failed_hides_cause_in_message_but_keeps_source() {
    let err = GenerationFailed::from(ClientError::NoImage { prompt: "a volcano".into() });
    assert_eq!(err.to_string(), "content generation failed; please try again");
    let source = std::error::Error::source(&err).map(|s| s.to_string()).unwrap_or_default();
    assert!(source.contains("a volcano"));
  }

  #[test]
  fn profile_rejected_lists_fields() {
    let err = ProfileRejected(vec![
      FieldError::new("studentName", "must not be empty"),
      FieldError::new("topic", "must not be empty"),
    ]);
    assert_eq!(err.to_string(), "invalid profile: studentName: must not be empty; topic: must not be empty");
  }

  #[test]
  fn empty_response_mentions_reason_when_known() {
    assert_eq!(ClientError::Empty { reason: None }.to_string(), "service returned no content");
    assert_eq!(
      ClientError::Empty { reason: Some("SAFETY".into()) }.to_string(),
      "service returned no content (SAFETY)"
    );
  }
}
