//! Minimal Gemini client for our use-cases.
//!
//! Two calls only: `generateContent` constrained to a JSON response schema (narrative +
//! workshop) and the image model's `predict` (coloring-book illustrations).
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to avoid PII leaks.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::ApiSettings;
use crate::error::{ClientError, ConfigError};
use crate::generator::{styled_prompt, ImageGenerator, TextGenerator};
use crate::prompt::GenerationRequest;
use crate::schema::Schema;
use crate::util::trunc_for_log;

const API_KEY_HEADER: &str = "x-goog-api-key";
const IMAGE_MIME: &str = "image/png";
const IMAGE_ASPECT_RATIO: &str = "4:3";

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub image_model: String,
  /// Style directive prefixed to every image prompt.
  pub image_style: String,
}

impl GeminiClient {
  pub fn new(settings: &ApiSettings, image_style: &str) -> Result<Self, ConfigError> {
    let mut builder = reqwest::Client::builder();
    if let Some(t) = settings.timeout {
      builder = builder.timeout(t);
    }
    let client = builder.build()?;
    Ok(Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.clone(),
      text_model: settings.text_model.clone(),
      image_model: settings.image_model.clone(),
      image_style: image_style.to_string(),
    })
  }

  async fn post<B: Serialize, R: for<'a> Deserialize<'a>>(&self, url: &str, body: &B) -> Result<R, ClientError> {
    let res = self
      .client
      .post(url)
      .header(USER_AGENT, "taller-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.api_key)
      .json(body)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(ClientError::Rejected { status: status.as_u16(), message });
    }
    Ok(res.json::<R>().await?)
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  #[instrument(level = "info", skip(self, request), fields(model = %self.text_model, prompt_len = request.prompt.len()))]
  async fn generate_json(&self, request: &GenerationRequest) -> Result<String, ClientError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.text_model);
    let body = GenerateContentRequest {
      contents: vec![Content { role: "user".into(), parts: vec![Part { text: request.prompt.clone() }] }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: &request.schema,
        temperature: request.temperature,
      },
    };

    let start = Instant::now();
    let result = self.post::<_, GenerateContentResponse>(&url, &body).await;
    let elapsed = start.elapsed();
    let res = match result {
      Ok(r) => r,
      Err(e) => {
        error!(target: "generation", ?elapsed, error = %e, "Text model call failed");
        return Err(e);
      }
    };

    if let Some(usage) = &res.usage_metadata {
      info!(target: "generation", prompt_tokens = ?usage.prompt_token_count, output_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text: String = res
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
      .unwrap_or_default();

    if text.trim().is_empty() {
      let reason = res
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .or_else(|| res.candidates.first().and_then(|c| c.finish_reason.clone()));
      error!(target: "generation", ?elapsed, ?reason, "Text model returned no content");
      return Err(ClientError::Empty { reason });
    }

    info!(target: "generation", ?elapsed, response_len = text.len(), "Text model response received");
    Ok(text.trim().to_string())
  }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
  #[instrument(level = "info", skip(self, scene), fields(model = %self.image_model, scene_len = scene.len()))]
  async fn generate_image(&self, scene: &str) -> Result<String, ClientError> {
    let url = format!("{}/models/{}:predict", self.base_url, self.image_model);
    let prompt = styled_prompt(&self.image_style, scene);
    let body = PredictRequest {
      instances: vec![PredictInstance { prompt }],
      parameters: PredictParameters {
        sample_count: 1,
        aspect_ratio: IMAGE_ASPECT_RATIO.into(),
        output_options: OutputOptions { mime_type: IMAGE_MIME.into() },
      },
    };

    let start = Instant::now();
    let res: PredictResponse = self.post(&url, &body).await.map_err(|e| {
      error!(target: "generation", elapsed = ?start.elapsed(), error = %e, "Image model call failed");
      e
    })?;

    let image = res
      .predictions
      .into_iter()
      .find_map(|p| p.bytes_base64_encoded.filter(|b| !b.is_empty()));
    match image {
      Some(b64) => {
        info!(target: "generation", elapsed = ?start.elapsed(), image_len = b64.len(), "Image received");
        Ok(b64)
      }
      None => {
        error!(target: "generation", elapsed = ?start.elapsed(), scene = %trunc_for_log(scene, 80), "Image model returned no images");
        Err(ClientError::NoImage { prompt: scene.to_string() })
      }
    }
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
  contents: Vec<Content>,
  generation_config: GenerationConfig<'a>,
}
#[derive(Serialize)]
struct Content { role: String, parts: Vec<Part> }
#[derive(Serialize)]
struct Part { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
  response_mime_type: String,
  response_schema: &'a Schema,
  temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<CandidatePart> }
#[derive(Deserialize)]
struct CandidatePart { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback { #[serde(default)] block_reason: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

// --- predict DTOs ---

#[derive(Serialize)]
struct PredictRequest { instances: Vec<PredictInstance>, parameters: PredictParameters }
#[derive(Serialize)]
struct PredictInstance { prompt: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters { sample_count: u32, aspect_ratio: String, output_options: OutputOptions }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions { mime_type: String }

#[derive(Deserialize)]
struct PredictResponse { #[serde(default)] predictions: Vec<Prediction> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction { #[serde(default)] bytes_base64_encoded: Option<String> }

/// Try to extract a clean error message from a Google API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
