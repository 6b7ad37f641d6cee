//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Validating a profile and running the generation pipeline for it
//!   - Exporting a generated workshop to PDF or markdown

use tracing::{info, instrument, warn};

use crate::assembler::RunStage;
use crate::domain::{GeneratedContent, StudentProfile};
use crate::error::{ExportError, WorkshopError};
use crate::export::{self, file_name, Audience, ExportFormat};
use crate::state::AppState;
use crate::validate::validate_profile;

/// A rendered export ready to be sent as an attachment.
pub struct Exported {
  pub file_name: String,
  pub content_type: &'static str,
  pub bytes: Vec<u8>,
}

/// Validate `profile`, then generate. Invalid profiles never reach the models.
#[instrument(level = "info", skip_all, fields(topic = %profile.topic))]
pub async fn generate_workshop<F>(
  state: &AppState,
  profile: &StudentProfile,
  on_stage: F,
) -> Result<GeneratedContent, WorkshopError>
where
  F: Fn(&RunStage) + Send + Sync,
{
  if let Err(rejected) = validate_profile(profile) {
    warn!(target: "taller_backend", fields = rejected.0.len(), error = %rejected, "Profile rejected");
    return Err(rejected.into());
  }
  let content = state.assembler.generate_with_progress(profile, on_stage).await?;
  Ok(content)
}

/// Render on the blocking pool; PDF drawing and image decoding are CPU bound.
#[instrument(level = "info", skip(content), fields(title = %content.narrative.title))]
pub async fn export_document(
  content: GeneratedContent,
  audience: Audience,
  format: ExportFormat,
) -> Result<Exported, ExportError> {
  let name = file_name(&content.narrative.title, audience, format);
  let bytes = tokio::task::spawn_blocking(move || export::render(&content, audience, format))
    .await
    .map_err(|e| ExportError::Pdf(format!("render task failed: {}", e)))??;
  info!(target: "taller_backend", file = %name, bytes = bytes.len(), "Export ready");
  Ok(Exported { file_name: name, content_type: format.content_type(), bytes })
}
