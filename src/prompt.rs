//! Prompt builder: turns a validated profile into the instruction text and response
//! schema for the text model. Pure; no I/O.

use crate::config::Prompts;
use crate::domain::{
  StudentProfile, CONCEPT_MAP_FACTS, FILL_IN_BLANK_ITEMS, FILL_IN_BLANK_OPTIONS, MATCHING_CANDIDATES, MATCHING_PROMPTS,
  ORDERING_SENTENCES, RIDDLE_ITEMS, SABER_OPTIONS, TRUE_FALSE_ITEMS, VIGNETTES,
};
use crate::schema::{response_schema, Schema};
use crate::util::fill_template;

/// Everything one text-generation call needs.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
  pub prompt: String,
  pub schema: Schema,
  pub temperature: f32,
}

pub fn build_request(profile: &StudentProfile, prompts: &Prompts, temperature: f32) -> GenerationRequest {
  GenerationRequest { prompt: build_prompt(profile, prompts), schema: response_schema(profile), temperature }
}

fn or_none(s: &str) -> &str {
  let s = s.trim();
  if s.is_empty() { "none" } else { s }
}

pub fn build_prompt(profile: &StudentProfile, prompts: &Prompts) -> String {
  let preferences = profile.preference_tags().join(", ");
  let difficulty = profile.difficulty.to_string();
  let chars = profile.character_count.to_string();
  let saber = profile.saber_question_count.to_string();
  let open = profile.open_questions().to_string();
  let vignettes = VIGNETTES.to_string();
  let saber_options = SABER_OPTIONS.to_string();
  let matching_prompts = MATCHING_PROMPTS.to_string();
  let matching_candidates = MATCHING_CANDIDATES.to_string();
  let concept_facts = CONCEPT_MAP_FACTS.to_string();
  let extras = extras_rule(profile);

  let body = fill_template(
    &prompts.workshop_template,
    &[
      ("name", profile.student_name.trim()),
      ("grade", or_none(&profile.grade)),
      ("topic", profile.topic.trim()),
      ("text_type", or_none(&profile.text_type)),
      ("difficulty", &difficulty),
      ("details", or_none(&profile.additional_details)),
      ("preferences", or_none(&preferences)),
      ("chars", &chars),
      ("vignettes", &vignettes),
      ("saber", &saber),
      ("saber_options", &saber_options),
      ("matching_prompts", &matching_prompts),
      ("matching_candidates", &matching_candidates),
      ("open", &open),
      ("concept_facts", &concept_facts),
      ("extras", &extras),
      ("language", prompts.output_language.trim()),
    ],
  );
  format!("{}\n\n{}", prompts.preamble.trim(), body.trim())
}

/// Workshop rule 6: one line per requested extra activity.
fn extras_rule(profile: &StudentProfile) -> String {
  if profile.extra_activities.is_empty() {
    return "6. Extra activities: none. Return an empty 'extraActivities' array.".into();
  }
  let mut lines = vec![format!(
    "6. Extra activities: exactly {} entries in 'extraActivities', one per activity below, each with its exact title:",
    profile.extra_activities.len()
  )];
  lines.extend(
    profile
      .extra_activities
      .iter()
      .map(|kind| format!("   - \"{}\": {}{}.", kind.title(), kind.instructions(), item_count_hint(profile, *kind))),
  );
  lines.join("\n")
}

fn item_count_hint(profile: &StudentProfile, kind: crate::domain::ActivityKind) -> String {
  use crate::domain::ActivityKind::*;
  match kind {
    TrueFalse => format!(" (exactly {TRUE_FALSE_ITEMS} statements)"),
    FillInTheBlank => {
      format!(" (exactly {FILL_IN_BLANK_ITEMS} sentences, {FILL_IN_BLANK_OPTIONS} options each)")
    }
    SentenceOrdering => format!(" (exactly {ORDERING_SENTENCES} sentences)"),
    WordSearch => {
      let ws = profile.word_search_params();
      let longest = ws.rows.max(ws.columns);
      format!(" (exactly {} words, each at most {longest} letters)", ws.word_count)
    }
    Riddles => format!(" (exactly {RIDDLE_ITEMS} riddles)"),
    Glossary => String::new(),
  }
}
