//! Application state: the content assembler wired to the Gemini client.
//!
//! Nothing here is mutable after startup; generated content is handed to the caller
//! and never stored.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::assembler::ContentAssembler;
use crate::config::{load_workshop_config_from_env, ApiSettings};
use crate::error::ConfigError;
use crate::gemini::GeminiClient;

pub struct AppState {
    pub assembler: ContentAssembler,
}

impl AppState {
    pub fn new(assembler: ContentAssembler) -> Self {
        Self { assembler }
    }

    /// Build state from env: API settings, optional TOML prompts, Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = ApiSettings::from_env()?;
        let config = load_workshop_config_from_env()?;

        let gemini = Arc::new(GeminiClient::new(&settings, &config.prompts.image_style)?);
        info!(
            target: "taller_backend",
            base_url = %gemini.base_url,
            text_model = %gemini.text_model,
            image_model = %gemini.image_model,
            timeout_secs = settings.timeout.map(|t| t.as_secs()),
            seeded = config.seed.is_some(),
            language = %config.prompts.output_language,
            "Gemini client ready"
        );

        let assembler = ContentAssembler::new(gemini.clone(), gemini, &config);
        Ok(Self::new(assembler))
    }
}
