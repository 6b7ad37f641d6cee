//! Configuration: API settings from the environment (the credential is mandatory) and
//! optional prompt overrides from a TOML file at WORKSHOP_CONFIG_PATH.
//!
//! Example TOML:
//!
//! ```toml
//! seed = 42
//! temperature = 0.7
//!
//! [prompts]
//! output_language = "English"
//! image_style = "Black-and-white coloring-book page, thick outlines, no shading."
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Student data and generation rules. Placeholders are listed on `Prompts::workshop_template`.
pub const DEFAULT_WORKSHOP_TEMPLATE: &str = r#"Student data:
- Name: {name}
- School grade: {grade}
- School topic: {topic}
- Text type: {text_type}
- Difficulty level: {difficulty}
- Additional details: {details}
- Personal preferences: {preferences}
- Text length: about {chars} characters

Follow ALL of these rules strictly. Counts are exact requirements.

NARRATIVE RULES:
1. Illustrations: insert exactly {vignettes} placeholders in the body text, in this reading order: [VIGNETTE_1], [VIGNETTE_2], [VIGNETTE_3], at key moments of the story. In 'narrative.imagePrompts' return exactly {vignettes} scene descriptions, one per placeholder, in the same order.
2. Length and format: the text must be about {chars} characters long. Use markdown.
3. Title and character: create a creative title and include '{name}' as a character.
4. Topic: '{topic}' must be central to the story. Include verifiable facts.
5. Language level: adapt the complexity to the '{difficulty}' difficulty level.
6. Personalization: weave these preferences into the plot: {preferences}.

WORKSHOP RULES:
1. SABER questions: exactly {saber} questions. Each has a context paragraph, a question, exactly {saber_options} options (single answer) and 'correctAnswer' copied verbatim from one of the options.
2. Matching: column A with exactly {matching_prompts} concepts, column B with exactly {matching_candidates} shuffled descriptions (one is a distractor). In 'answers' give, for each column A item, the exact column B text it matches.
3. Open questions: exactly {open} reflection questions.
4. Creative activity: exactly 1 activity where the student creates something new.
5. Concept map: exactly {concept_facts} real facts from the story, NOT in the order they appear.
{extras}

Write every text field in {language}.
Your answer MUST be only a valid JSON object matching the provided schema. Do not add explanations or code fences."#;

/// Connection settings for the hosted text and image models.
#[derive(Clone, Debug)]
pub struct ApiSettings {
  pub api_key: String,
  pub base_url: String,
  pub text_model: String,
  pub image_model: String,
  /// None keeps whatever the transport imposes.
  pub timeout: Option<Duration>,
}

impl ApiSettings {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Same as `from_env` but reads variables through `lookup`.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let api_key = lookup("GEMINI_API_KEY")
      .or_else(|| lookup("API_KEY"))
      .filter(|k| !k.trim().is_empty())
      .ok_or(ConfigError::MissingApiKey)?;
    let base_url = lookup("GEMINI_BASE_URL")
      .unwrap_or_else(|| DEFAULT_BASE_URL.into())
      .trim_end_matches('/')
      .to_string();
    let text_model = lookup("GEMINI_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.into());
    let image_model = lookup("GEMINI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.into());
    let timeout = match lookup("GEMINI_TIMEOUT_SECS") {
      Some(v) => {
        let secs = v
          .trim()
          .parse::<u64>()
          .map_err(|_| ConfigError::InvalidEnv { var: "GEMINI_TIMEOUT_SECS", value: v.clone() })?;
        Some(Duration::from_secs(secs))
      }
      None => None,
    };
    Ok(Self { api_key, base_url, text_model, image_model, timeout })
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
  pub prompts: Prompts,
  /// Sampling temperature for the text model.
  pub temperature: f32,
  /// Fixed seed for word-search placement and sentence shuffles.
  pub seed: Option<u64>,
}

impl Default for WorkshopConfig {
  fn default() -> Self {
    Self { prompts: Prompts::default(), temperature: DEFAULT_TEMPERATURE, seed: None }
  }
}

/// Prompt texts. Defaults target Colombian primary/secondary classrooms.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prompts {
  pub preamble: String,
  /// Language of every generated text field.
  pub output_language: String,
  /// Prefixed to every image prompt so that all pictures of a run share one style.
  pub image_style: String,
  /// Scene for the cover image. Placeholders: {title}, {student_name}, {topic}.
  pub cover_template: String,
  /// Body of the text prompt, after the preamble. Placeholders: {name}, {grade}, {topic},
  /// {text_type}, {difficulty}, {details}, {preferences}, {chars}, {vignettes}, {saber},
  /// {saber_options}, {matching_prompts}, {matching_candidates}, {open}, {concept_facts},
  /// {extras}, {language}.
  pub workshop_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      preamble: "You are an expert creative writer and teacher. Your task is to write a narrative text, \
                 prompts for its illustrations, and a complete comprehension workshop based on the student data below."
        .into(),
      output_language: "Spanish".into(),
      image_style: "Black-and-white coloring-book page, simple line art, thick outlines, no shading.".into(),
      cover_template: "Cover of the story titled \"{title}\" showing the main character, {student_name}, \
                       in a scene about {topic}."
        .into(),
      workshop_template: DEFAULT_WORKSHOP_TEMPLATE.into(),
    }
  }
}

/// Load `WorkshopConfig` from WORKSHOP_CONFIG_PATH, or defaults when unset.
/// A path that is set but unreadable or invalid is an error.
pub fn load_workshop_config_from_env() -> Result<WorkshopConfig, ConfigError> {
  let mut cfg = match std::env::var("WORKSHOP_CONFIG_PATH") {
    Ok(path) => {
      let s = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
      let cfg = parse_workshop_config(&s).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
      info!(target: "taller_backend", %path, "Loaded workshop config (TOML)");
      cfg
    }
    Err(_) => WorkshopConfig::default(),
  };

  if let Ok(v) = std::env::var("WORKSHOP_SEED") {
    let seed = v
      .trim()
      .parse::<u64>()
      .map_err(|_| ConfigError::InvalidEnv { var: "WORKSHOP_SEED", value: v.clone() })?;
    cfg.seed = Some(seed);
  }
  Ok(cfg)
}

pub fn parse_workshop_config(s: &str) -> Result<WorkshopConfig, toml::de::Error> {
  toml::from_str::<WorkshopConfig>(s)
}
