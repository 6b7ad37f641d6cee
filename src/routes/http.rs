//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures map to status codes here.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::domain::GeneratedContent;
use crate::error::{ExportError, FieldError, ProfileRejected, WorkshopError};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;
use crate::validate::decode_profile;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_catalog() -> impl IntoResponse { Json(catalog()) }

/// Body problems (bad JSON, wrong field types) are answered like validation failures.
#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_workshop(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GeneratedContent>, WorkshopError> {
  let Json(raw) = payload.map_err(|rejection| {
    warn!(target: "taller_backend", status = %rejection.status(), "Workshop body rejected");
    ProfileRejected(vec![FieldError::new("body", rejection.body_text())])
  })?;
  let profile = decode_profile(raw).inspect_err(|rejected| {
    warn!(target: "taller_backend", error = %rejected, "Profile did not decode");
  })?;
  let content = generate_workshop(&state, &profile, |_| {}).await?;
  info!(target: "taller_backend", title = %content.narrative.title, "HTTP workshop generated");
  Ok(Json(content))
}

#[instrument(level = "info", skip(body), fields(audience = body.audience.label(), format = body.format.extension()))]
pub async fn http_post_export(Json(body): Json<ExportIn>) -> Result<Response, ExportError> {
  let out = export_document(body.content, body.audience, body.format).await?;
  let disposition = format!("attachment; filename=\"{}\"", out.file_name);
  Ok(
    (
      [
        (header::CONTENT_TYPE, out.content_type.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      out.bytes,
    )
      .into_response(),
  )
}

impl IntoResponse for WorkshopError {
  fn into_response(self) -> Response {
    match self {
      WorkshopError::Invalid(rejected) => {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ValidationErrorOut { errors: rejected.0 })).into_response()
      }
      WorkshopError::Failed(failed) => {
        error!(target: "taller_backend", cause = %failed.cause, "Workshop generation failed");
        let body = ErrorOut { message: failed.to_string(), retryable: true };
        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
      }
    }
  }
}

impl IntoResponse for ExportError {
  fn into_response(self) -> Response {
    error!(target: "taller_backend", error = %self, "Export failed");
    let body = ErrorOut { message: self.to_string(), retryable: false };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
  }
}
