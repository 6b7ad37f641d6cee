//! Parsing of the text model's JSON: schema check, typed decode, semantic checks, and
//! conversion of the requested extra activities into their final shapes.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::domain::{
  ActivityContent, ActivityKind, CreativeActivity, Difficulty, ExtraActivity, FillInBlankItem, MatchingExercise,
  RiddleItem, SaberQuestion, TrueFalseItem, WordSearchParams,
};
use crate::error::ClientError;
use crate::prompt::GenerationRequest;
use crate::wordsearch::WordSearchBuilder;

#[derive(Clone, Debug, Deserialize)]
pub struct ModelResponse {
  pub narrative: ModelNarrative,
  pub workshop: ModelWorkshop,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelNarrative {
  pub title: String,
  pub text: String,
  #[serde(default)]
  pub image_prompts: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelWorkshop {
  pub saber_questions: Vec<SaberQuestion>,
  pub matching_exercise: MatchingExercise,
  pub open_questions: Vec<String>,
  pub creative_activity: CreativeActivity,
  pub concept_map_facts: Vec<String>,
  #[serde(default)]
  pub extra_activities: Vec<ModelActivity>,
}

/// One extra activity as returned by the model: a title plus the field for its kind.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelActivity {
  pub title: String,
  #[serde(default)] pub content: Option<String>,
  #[serde(default)] pub true_false: Option<Vec<TrueFalseItem>>,
  #[serde(default)] pub fill_in_the_blank: Option<Vec<FillInBlankItem>>,
  #[serde(default)] pub sentence_ordering: Option<Vec<String>>,
  #[serde(default)] pub word_search_words: Option<Vec<String>>,
  #[serde(default)] pub riddles: Option<Vec<RiddleItem>>,
}

impl ModelActivity {
  pub fn kind(&self) -> Option<ActivityKind> {
    ActivityKind::from_title(&self.title)
  }

  fn has_body_for(&self, kind: ActivityKind) -> bool {
    fn non_empty<T>(v: &Option<Vec<T>>) -> bool {
      v.as_ref().is_some_and(|v| !v.is_empty())
    }
    match kind {
      ActivityKind::TrueFalse => non_empty(&self.true_false),
      ActivityKind::FillInTheBlank => non_empty(&self.fill_in_the_blank),
      ActivityKind::SentenceOrdering => non_empty(&self.sentence_ordering),
      ActivityKind::WordSearch => non_empty(&self.word_search_words),
      ActivityKind::Riddles => non_empty(&self.riddles),
      ActivityKind::Glossary => self.content.as_deref().is_some_and(|c| !c.trim().is_empty()),
    }
  }
}

/// Decode and check the raw model output. Nothing is coerced: any deviation from the
/// contract is reported as a schema mismatch.
pub fn parse_model_response(
  raw: &str,
  request: &GenerationRequest,
  requested: &[ActivityKind],
) -> Result<ModelResponse, ClientError> {
  let value: Value = serde_json::from_str(raw)?;

  let problems = request.schema.check(&value);
  if !problems.is_empty() {
    return Err(ClientError::SchemaMismatch(problems));
  }

  let parsed: ModelResponse = serde_json::from_value(value)?;
  let problems = semantic_problems(&parsed, requested);
  if !problems.is_empty() {
    return Err(ClientError::SchemaMismatch(problems));
  }
  Ok(parsed)
}

fn semantic_problems(parsed: &ModelResponse, requested: &[ActivityKind]) -> Vec<String> {
  let mut problems = Vec::new();
  let ws = &parsed.workshop;

  for (i, q) in ws.saber_questions.iter().enumerate() {
    if q.correct_index().is_none() {
      problems.push(format!("$.workshop.saberQuestions[{i}].correctAnswer: does not match any option"));
    }
  }

  let key = ws.matching_exercise.answer_key();
  for (i, k) in key.iter().enumerate() {
    match k {
      None => problems.push(format!("$.workshop.matchingExercise.answers[{i}]: not found in columnB")),
      Some(idx) if key[..i].contains(&Some(*idx)) => {
        problems.push(format!("$.workshop.matchingExercise.answers[{i}]: columnB item used twice"))
      }
      Some(_) => {}
    }
  }

  let mut seen: Vec<ActivityKind> = Vec::new();
  for (i, a) in ws.extra_activities.iter().enumerate() {
    let path = format!("$.workshop.extraActivities[{i}]");
    let Some(kind) = a.kind() else {
      problems.push(format!("{path}.title: unknown activity {:?}", a.title));
      continue;
    };
    if !requested.contains(&kind) {
      problems.push(format!("{path}.title: {:?} was not requested", a.title));
    } else if seen.contains(&kind) {
      problems.push(format!("{path}.title: {:?} returned twice", a.title));
    }
    seen.push(kind);
    if !a.has_body_for(kind) {
      problems.push(format!("{path}: missing content for {:?}", kind.title()));
    }
    for (j, item) in a.riddles.iter().flatten().enumerate() {
      if item.answer.trim().is_empty() {
        problems.push(format!("{path}.riddles[{j}].answer: must not be empty"));
      }
    }
    for (j, item) in a.fill_in_the_blank.iter().flatten().enumerate() {
      if !item.options.contains(&item.answer) {
        problems.push(format!("{path}.fillInTheBlank[{j}].answer: does not match any option"));
      }
    }
  }
  for kind in requested {
    if !seen.contains(kind) {
      problems.push(format!("$.workshop.extraActivities: missing {:?}", kind.title()));
    }
  }
  problems
}

/// Turn a checked model activity into its final shape: word-search grids are built and
/// ordering sentences shuffled with `rng`.
pub fn finish_activity<R: Rng>(
  activity: ModelActivity,
  word_search: WordSearchParams,
  difficulty: Difficulty,
  rng: &mut R,
) -> Option<ExtraActivity> {
  let kind = activity.kind()?;
  let content = match kind {
    ActivityKind::TrueFalse => ActivityContent::TrueFalse { items: activity.true_false.unwrap_or_default() },
    ActivityKind::FillInTheBlank => {
      ActivityContent::FillInTheBlank { items: activity.fill_in_the_blank.unwrap_or_default() }
    }
    ActivityKind::SentenceOrdering => {
      let (shuffled, correct_order) = shuffle_sentences(activity.sentence_ordering.unwrap_or_default(), rng);
      ActivityContent::SentenceOrdering { shuffled, correct_order }
    }
    ActivityKind::WordSearch => {
      let words = activity.word_search_words.unwrap_or_default();
      let grid = WordSearchBuilder::new(word_search.rows as usize, word_search.columns as usize, difficulty)
        .build(&words, rng);
      if grid.words.len() < words.len() {
        warn!(target: "generation", requested = words.len(), placed = grid.words.len(), "Some word-search words could not be placed");
      }
      ActivityContent::WordSearch(grid)
    }
    ActivityKind::Riddles => ActivityContent::Riddles { items: activity.riddles.unwrap_or_default() },
    ActivityKind::Glossary => ActivityContent::Markdown { content: activity.content.unwrap_or_default() },
  };
  Some(ExtraActivity { title: kind.title().to_string(), content })
}

/// Shuffle sentences given in story order. Returns the shuffled list and, for each
/// sentence in story order, its index in the shuffled list.
pub fn shuffle_sentences<R: Rng>(sentences: Vec<String>, rng: &mut R) -> (Vec<String>, Vec<usize>) {
  let n = sentences.len();
  let mut order: Vec<usize> = (0..n).collect();
  order.shuffle(rng);
  if n > 1 && order.iter().enumerate().all(|(i, &o)| i == o) {
    order.rotate_left(1);
  }

  let mut correct_order = vec![0; n];
  for (pos, &original) in order.iter().enumerate() {
    correct_order[original] = pos;
  }
  let shuffled = order.into_iter().map(|i| sentences[i].clone()).collect();
  (shuffled, correct_order)
}
