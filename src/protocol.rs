//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::assembler::RunStage;
use crate::domain::{
    ActivityKind, Difficulty, GeneratedContent, WordSearchParams, CHARACTER_COUNT,
    DEFAULT_CHARACTER_COUNT, DEFAULT_OPEN_QUESTIONS, DEFAULT_SABER_QUESTIONS, OPEN_QUESTIONS, SABER_QUESTIONS,
    WORD_SEARCH_SIDE, WORD_SEARCH_WORDS,
};
use crate::error::FieldError;
use crate::export::{Audience, ExportFormat};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    /// The profile stays raw JSON until `validate::decode_profile`, so a badly typed
    /// field is answered with `invalid_profile` like any other rejected field.
    Generate { profile: serde_json::Value },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    /// Progress of the running generation, e.g. `{"type":"stage","stage":"requesting_images","count":4}`.
    Stage {
        #[serde(flatten)]
        stage: RunStage,
    },
    Content {
        content: Box<GeneratedContent>,
    },
    InvalidProfile {
        errors: Vec<FieldError>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportIn {
    pub content: GeneratedContent,
    #[serde(default)]
    pub audience: Audience,
    #[serde(default)]
    pub format: ExportFormat,
}

/// 422 body for a rejected profile.
#[derive(Debug, Serialize)]
pub struct ValidationErrorOut {
    pub errors: Vec<FieldError>,
}

/// Body for every other failure.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Serialize)]
pub struct ActivityOut {
    pub id: ActivityKind,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RangeOut {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl RangeOut {
    fn new(range: RangeInclusive<u32>, default: u32) -> Self {
        Self { min: *range.start(), max: *range.end(), default }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangesOut {
    pub character_count: RangeOut,
    pub saber_question_count: RangeOut,
    pub open_question_count: RangeOut,
    pub word_search_words: RangeOut,
    pub word_search_rows: RangeOut,
    pub word_search_columns: RangeOut,
}

/// What the form needs to render its controls.
#[derive(Debug, Serialize)]
pub struct CatalogOut {
    pub activities: Vec<ActivityOut>,
    pub difficulties: Vec<Difficulty>,
    pub ranges: RangesOut,
}

pub fn catalog() -> CatalogOut {
    let ws = WordSearchParams::default();
    CatalogOut {
        activities: ActivityKind::ALL
            .into_iter()
            .map(|id| ActivityOut { id, title: id.title() })
            .collect(),
        difficulties: Difficulty::ALL.to_vec(),
        ranges: RangesOut {
            character_count: RangeOut::new(CHARACTER_COUNT, DEFAULT_CHARACTER_COUNT),
            saber_question_count: RangeOut::new(SABER_QUESTIONS, DEFAULT_SABER_QUESTIONS),
            open_question_count: RangeOut::new(OPEN_QUESTIONS, DEFAULT_OPEN_QUESTIONS),
            word_search_words: RangeOut::new(WORD_SEARCH_WORDS, ws.word_count),
            word_search_rows: RangeOut::new(WORD_SEARCH_SIDE, ws.rows),
            word_search_columns: RangeOut::new(WORD_SEARCH_SIDE, ws.columns),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_messages_flatten_the_stage() {
        let msg = ServerWsMessage::Stage { stage: RunStage::RequestingImages { count: 4 } };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, serde_json::json!({"type": "stage", "stage": "requesting_images", "count": 4}));
    }

    #[test]
    fn generate_message_carries_a_profile() {
        let msg: ClientWsMessage = serde_json::from_str(
            r#"{"type":"generate","profile":{"studentName":"Ana","topic":"Volcanoes","extraActivities":["riddles"]}}"#,
        )
        .unwrap();
        match msg {
            ClientWsMessage::Generate { profile } => assert_eq!(profile["extraActivities"], serde_json::json!(["riddles"])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn catalog_lists_every_activity_with_ranges() {
        let v = serde_json::to_value(catalog()).unwrap();
        assert_eq!(v["activities"].as_array().map(Vec::len), Some(6));
        assert_eq!(v["activities"][3], serde_json::json!({"id": "word_search", "title": "Word Search"}));
        assert_eq!(v["difficulties"], serde_json::json!(["low", "medium", "high"]));
        assert_eq!(v["ranges"]["saberQuestionCount"], serde_json::json!({"min": 3, "max": 10, "default": 5}));
    }
}
