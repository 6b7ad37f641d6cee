//! Taller · Reading-comprehension workshop generator backend
//!
//! - Axum HTTP + WebSocket API
//! - Gemini text model for the narrative and workshop, Imagen for the illustrations
//! - PDF / markdown export in student and teacher variants
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   GEMINI_API_KEY       : required (API_KEY is accepted as a fallback)
//!   GEMINI_BASE_URL      : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_TEXT_MODEL    : default "gemini-2.5-flash"
//!   GEMINI_IMAGE_MODEL   : default "imagen-4.0-generate-001"
//!   GEMINI_TIMEOUT_SECS  : per-request HTTP timeout (unset = none)
//!   WORKSHOP_CONFIG_PATH : path to TOML config (prompt texts, temperature, seed)
//!   WORKSHOP_SEED        : u64 seed for word-search grids and sentence shuffles
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod validate;
mod schema;
mod prompt;
mod generator;
mod gemini;
mod response;
mod wordsearch;
mod narrative;
mod assembler;
mod export;
mod state;
mod protocol;
mod logic;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Missing credentials or a broken config file stop the process here.
  let state = match AppState::from_env() {
    Ok(s) => Arc::new(s),
    Err(e) => {
      error!(target: "taller_backend", error = %e, "Startup configuration error");
      return Err(e.into());
    }
  };

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "taller_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
