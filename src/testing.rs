//! Test doubles for the model seams and a conforming model response.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use crate::assembler::ContentAssembler;
use crate::config::WorkshopConfig;
use crate::domain::{ActivityKind, GeneratedContent, Narrative, StudentProfile, Workshop};
use crate::error::ClientError;
use crate::generator::{ImageGenerator, TextGenerator};
use crate::prompt::{build_request, GenerationRequest};
use crate::response::{finish_activity, parse_model_response};
use crate::state::AppState;

/// 1x1 transparent PNG.
pub const TINY_PNG: &str =
  "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const WORDS: [&str; 15] = [
  "MAGMA", "LAVA", "CRATER", "ASH", "ERUPTION", "ROCK", "HEAT", "SMOKE", "CONE", "VENT", "FIRE", "STONE", "GAS",
  "PLATE", "EARTH",
];

pub fn profile(json: &str) -> StudentProfile {
  serde_json::from_str(json).expect("test profile")
}

/// A model response that satisfies the contract for `profile`.
pub fn sample_response(profile: &StudentProfile) -> Value {
  let saber: Vec<Value> = (0..profile.saber_question_count)
    .map(|i| {
      json!({
        "context": format!("Context paragraph {i} about volcanoes, long enough to frame the question properly."),
        "question": format!("Question {i}?"),
        "options": [format!("A{i}"), format!("B{i}"), format!("C{i}"), format!("D{i}")],
        "correctAnswer": format!("B{i}")
      })
    })
    .collect();
  let open: Vec<String> = (0..profile.open_questions()).map(|i| format!("Open question {i}?")).collect();

  let extras: Vec<Value> = profile
    .extra_activities
    .iter()
    .map(|kind| {
      let mut a = json!({ "title": kind.title() });
      match kind {
        ActivityKind::TrueFalse => {
          a["trueFalse"] = (0..5).map(|i| json!({"statement": format!("Statement {i}"), "isTrue": i % 2 == 0})).collect();
        }
        ActivityKind::FillInTheBlank => {
          a["fillInTheBlank"] = (0..5)
            .map(|i| json!({"sentence": format!("Gap ____ {i}"), "options": [format!("ok{i}"), "no", "maybe"], "answer": format!("ok{i}")}))
            .collect();
        }
        ActivityKind::SentenceOrdering => {
          a["sentenceOrdering"] = json!(["First.", "Second.", "Third.", "Fourth.", "Fifth."]);
        }
        ActivityKind::WordSearch => {
          let n = profile.word_search_params().word_count as usize;
          a["wordSearchWords"] = json!(WORDS.iter().take(n).collect::<Vec<_>>());
        }
        ActivityKind::Glossary => {
          a["content"] = json!("- **Magma**: molten rock");
        }
        ActivityKind::Riddles => {
          a["riddles"] = json!([
            {"riddle": "I sleep inside the mountain\nand wake up burning.", "answer": "Magma"},
            {"riddle": "I am the mouth at the very top.", "answer": "Crater"},
            {"riddle": "I fall like grey snow after the blast.", "answer": "Ash"}
          ]);
        }
      }
      a
    })
    .collect();

  json!({
    "narrative": {
      "title": "Ana and the Sleeping Volcano",
      "text": "Intro [VIGNETTE_1] middle [VIGNETTE_2] end [VIGNETTE_3]",
      "imagePrompts": ["Ana looks at the volcano", "Ana finds lava", "Ana goes home"]
    },
    "workshop": {
      "saberQuestions": saber,
      "matchingExercise": {
        "columnA": ["Magma", "Crater", "Lava", "Ash"],
        "columnB": ["Opening at the top", "Tiny rock fragments", "A kind of cloud", "Molten rock underground", "Molten rock on the surface"],
        "answers": ["Molten rock underground", "Opening at the top", "Molten rock on the surface", "Tiny rock fragments"]
      },
      "openQuestions": open,
      "creativeActivity": {"title": "Build a volcano", "description": "Use clay to model a volcano."},
      "conceptMapFacts": ["Fact 1", "Fact 2", "Fact 3", "Fact 4", "Fact 5"],
      "extraActivities": extras
    }
  })
}

/// Finished content for `profile`, built from `sample_response` with `TINY_PNG` images.
pub fn sample_content(profile: &StudentProfile) -> GeneratedContent {
  let config = WorkshopConfig::default();
  let request = build_request(profile, &config.prompts, config.temperature);
  let parsed = parse_model_response(&sample_response(profile).to_string(), &request, &profile.extra_activities)
    .expect("sample response conforms");
  let mut rng = StdRng::seed_from_u64(3);
  let workshop = parsed.workshop;
  GeneratedContent {
    narrative: Narrative {
      title: parsed.narrative.title,
      text: parsed.narrative.text,
      cover_image: TINY_PNG.to_string(),
      vignette_images: vec![TINY_PNG.to_string(); 3],
    },
    workshop: Workshop {
      saber_questions: workshop.saber_questions,
      matching_exercise: workshop.matching_exercise,
      open_questions: workshop.open_questions,
      creative_activity: workshop.creative_activity,
      concept_map_facts: workshop.concept_map_facts,
      extra_activities: workshop
        .extra_activities
        .into_iter()
        .filter_map(|a| finish_activity(a, profile.word_search_params(), profile.difficulty, &mut rng))
        .collect(),
    },
  }
}

/// App state whose assembler talks to the given doubles, seeded for stable output.
pub fn fake_state(text: Arc<FakeText>, images: Arc<FakeImages>) -> Arc<AppState> {
  let config = WorkshopConfig { seed: Some(7), ..WorkshopConfig::default() };
  Arc::new(AppState::new(ContentAssembler::new(text, images, &config)))
}

/// Text model double: returns a fixed body or fails.
pub struct FakeText {
  response: Result<String, u16>,
  pub calls: AtomicUsize,
}

impl FakeText {
  pub fn returning(body: impl Into<String>) -> Self {
    Self { response: Ok(body.into()), calls: AtomicUsize::new(0) }
  }

  pub fn failing(status: u16) -> Self {
    Self { response: Err(status), calls: AtomicUsize::new(0) }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TextGenerator for FakeText {
  async fn generate_json(&self, _request: &GenerationRequest) -> Result<String, ClientError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match &self.response {
      Ok(body) => Ok(body.clone()),
      Err(status) => Err(ClientError::Rejected { status: *status, message: "quota exceeded".into() }),
    }
  }
}

/// Image model double: "renders" each scene as the base64 of its own text, records every
/// scene and the peak number of concurrent calls, and fails for scenes containing `fail_on`.
#[derive(Default)]
pub struct FakeImages {
  fail_on: Option<String>,
  pub scenes: Mutex<Vec<String>>,
  in_flight: AtomicUsize,
  pub max_in_flight: AtomicUsize,
}

impl FakeImages {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failing_on(needle: &str) -> Self {
    Self { fail_on: Some(needle.to_string()), ..Self::default() }
  }

  pub fn scenes(&self) -> Vec<String> {
    self.scenes.lock().expect("scenes lock").clone()
  }

  pub fn decode(b64: &str) -> String {
    String::from_utf8(STANDARD.decode(b64).expect("base64")).expect("utf8")
  }
}

#[async_trait]
impl ImageGenerator for FakeImages {
  async fn generate_image(&self, scene: &str) -> Result<String, ClientError> {
    self.scenes.lock().expect("scenes lock").push(scene.to_string());
    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    match &self.fail_on {
      Some(needle) if scene.contains(needle.as_str()) => Err(ClientError::NoImage { prompt: scene.to_string() }),
      _ => Ok(STANDARD.encode(scene)),
    }
  }
}
