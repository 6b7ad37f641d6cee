//! Seams between the assembler and the hosted models. The real implementation lives in
//! `gemini`; tests substitute fakes.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::prompt::GenerationRequest;

/// Text model constrained to return JSON for `request.schema`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Raw JSON text as returned by the model.
  async fn generate_json(&self, request: &GenerationRequest) -> Result<String, ClientError>;
}

/// Image model returning one base64-encoded PNG per scene.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
  async fn generate_image(&self, scene: &str) -> Result<String, ClientError>;
}

/// Full image prompt: the shared style directive followed by the scene.
pub fn styled_prompt(style: &str, scene: &str) -> String {
  format!("{} Scene: {}", style.trim(), scene.trim())
}
