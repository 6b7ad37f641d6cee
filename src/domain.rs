//! Domain models: the student profile submitted by the form, the activity catalog,
//! and the generated narrative + workshop record handed to rendering and export.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const CHARACTER_COUNT: RangeInclusive<u32> = 500..=3000;
pub const SABER_QUESTIONS: RangeInclusive<u32> = 3..=10;
pub const OPEN_QUESTIONS: RangeInclusive<u32> = 1..=5;
pub const WORD_SEARCH_WORDS: RangeInclusive<u32> = 5..=15;
pub const WORD_SEARCH_SIDE: RangeInclusive<u32> = 10..=25;

pub const DEFAULT_CHARACTER_COUNT: u32 = 1500;
pub const DEFAULT_SABER_QUESTIONS: u32 = 5;
pub const DEFAULT_OPEN_QUESTIONS: u32 = 2;

/// Fixed workshop shape.
pub const SABER_OPTIONS: usize = 4;
pub const MATCHING_PROMPTS: usize = 4;
pub const MATCHING_CANDIDATES: usize = 5;
pub const CONCEPT_MAP_FACTS: usize = 5;
pub const VIGNETTES: usize = 3;

/// Item counts requested for the structured extra activities.
pub const TRUE_FALSE_ITEMS: usize = 5;
pub const FILL_IN_BLANK_ITEMS: usize = 5;
pub const FILL_IN_BLANK_OPTIONS: usize = 3;
pub const ORDERING_SENTENCES: usize = 5;
pub const RIDDLE_ITEMS: usize = 3;

/// Language complexity level requested for the narrative.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  #[serde(alias = "bajo", alias = "Bajo")]
  Low,
  #[default]
  #[serde(alias = "medio", alias = "Medio")]
  Medium,
  #[serde(alias = "alto", alias = "Alto")]
  High,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Low => "low",
      Difficulty::Medium => "medium",
      Difficulty::High => "high",
    }
  }
}

impl std::fmt::Display for Difficulty {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Optional workshop activities the requester can pick from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
  #[serde(alias = "True or False")]
  TrueFalse,
  #[serde(alias = "Fill in the Blanks")]
  FillInTheBlank,
  #[serde(alias = "Sentence Ordering")]
  SentenceOrdering,
  #[serde(alias = "Word Search")]
  WordSearch,
  #[serde(alias = "Glossary")]
  Glossary,
  #[serde(alias = "Riddles")]
  Riddles,
}

impl ActivityKind {
  pub const ALL: [ActivityKind; 6] = [
    ActivityKind::TrueFalse,
    ActivityKind::FillInTheBlank,
    ActivityKind::SentenceOrdering,
    ActivityKind::WordSearch,
    ActivityKind::Glossary,
    ActivityKind::Riddles,
  ];

  /// Title used in prompts, in the response schema enum and as the section heading.
  pub fn title(self) -> &'static str {
    match self {
      ActivityKind::TrueFalse => "True or False",
      ActivityKind::FillInTheBlank => "Fill in the Blanks",
      ActivityKind::SentenceOrdering => "Sentence Ordering",
      ActivityKind::WordSearch => "Word Search",
      ActivityKind::Glossary => "Glossary",
      ActivityKind::Riddles => "Riddles",
    }
  }

  pub fn from_title(title: &str) -> Option<Self> {
    let wanted = title.trim();
    Self::ALL.into_iter().find(|k| k.title().eq_ignore_ascii_case(wanted))
  }

  /// Short description of the content the model must supply for this activity.
  pub fn instructions(self) -> &'static str {
    match self {
      ActivityKind::TrueFalse => "fill `trueFalse` with statements about the story, each with isTrue",
      ActivityKind::FillInTheBlank => "fill `fillInTheBlank` with sentences containing one '____' gap, answer options and the answer",
      ActivityKind::SentenceOrdering => "fill `sentenceOrdering` with sentences summarizing the story, listed in the order they happen",
      ActivityKind::WordSearch => "fill `wordSearchWords` with single words taken from the story (no spaces)",
      ActivityKind::Glossary => "fill `content` with a markdown glossary of difficult words from the story",
      ActivityKind::Riddles => "fill `riddles` with riddles about elements of the story; keep each answer out of the riddle text and put it in `answer`",
    }
  }
}

/// Word-search dimensions requested in the profile.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WordSearchParams {
  pub word_count: u32,
  pub rows: u32,
  pub columns: u32,
}

impl Default for WordSearchParams {
  fn default() -> Self {
    Self { word_count: 8, rows: 12, columns: 12 }
  }
}

/// Everything the form collects about the student and the requested workshop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
  #[serde(default)] pub student_name: String,
  #[serde(default)] pub grade: String,
  #[serde(default)] pub topic: String,
  #[serde(default)] pub text_type: String,
  #[serde(default)] pub difficulty: Difficulty,
  #[serde(default)] pub additional_details: String,
  #[serde(default)] pub preferences: Vec<String>,
  #[serde(default = "default_character_count")] pub character_count: u32,
  #[serde(default = "default_saber_questions")] pub saber_question_count: u32,
  #[serde(default)] pub extra_activities: Vec<ActivityKind>,
  #[serde(default)] pub open_question_count: Option<u32>,
  #[serde(default)] pub word_search: Option<WordSearchParams>,
}

fn default_character_count() -> u32 { DEFAULT_CHARACTER_COUNT }
fn default_saber_questions() -> u32 { DEFAULT_SABER_QUESTIONS }

impl StudentProfile {
  pub fn open_questions(&self) -> u32 {
    self.open_question_count.unwrap_or(DEFAULT_OPEN_QUESTIONS)
  }

  pub fn word_search_params(&self) -> WordSearchParams {
    self.word_search.unwrap_or_default()
  }

  /// Preference tags as a set: trimmed, non-empty, first occurrence wins.
  pub fn preference_tags(&self) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in &self.preferences {
      let p = p.trim();
      if !p.is_empty() && !out.contains(&p) {
        out.push(p);
      }
    }
    out
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
  pub title: String,
  /// Body text with `[VIGNETTE_n]` markers.
  pub text: String,
  /// Base64 PNG.
  pub cover_image: String,
  /// Base64 PNGs; index i belongs to marker `[VIGNETTE_{i+1}]`.
  pub vignette_images: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaberQuestion {
  pub context: String,
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
}

impl SaberQuestion {
  pub fn correct_index(&self) -> Option<usize> {
    self.options.iter().position(|o| o == &self.correct_answer)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchingExercise {
  pub column_a: Vec<String>,
  pub column_b: Vec<String>,
  /// For each column-A item, the column-B text it matches.
  #[serde(default)]
  pub answers: Vec<String>,
}

impl MatchingExercise {
  /// Column-B index matched by each column-A item.
  pub fn answer_key(&self) -> Vec<Option<usize>> {
    self.answers
      .iter()
      .map(|a| self.column_b.iter().position(|b| b == a))
      .collect()
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreativeActivity {
  pub title: String,
  pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrueFalseItem {
  pub statement: String,
  pub is_true: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FillInBlankItem {
  pub sentence: String,
  pub options: Vec<String>,
  pub answer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RiddleItem {
  pub riddle: String,
  pub answer: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridCell {
  pub row: usize,
  pub col: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordPlacement {
  pub word: String,
  pub start: GridCell,
  pub end: GridCell,
}

impl WordPlacement {
  /// Cells covered by the word, from start to end.
  #[cfg(test)]
  pub fn cells(&self) -> Vec<GridCell> {
    let len = self.word.chars().count();
    let dr = (self.end.row as isize - self.start.row as isize).signum();
    let dc = (self.end.col as isize - self.start.col as isize).signum();
    (0..len as isize)
      .map(|i| GridCell {
        row: (self.start.row as isize + dr * i) as usize,
        col: (self.start.col as isize + dc * i) as usize,
      })
      .collect()
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WordSearch {
  /// One string per row, one letter per column.
  pub grid: Vec<String>,
  pub words: Vec<String>,
  pub solutions: Vec<WordPlacement>,
}

impl WordSearch {
  pub fn rows(&self) -> usize {
    self.grid.len()
  }

  pub fn columns(&self) -> usize {
    self.grid.first().map(|r| r.chars().count()).unwrap_or(0)
  }

  #[cfg(test)]
  pub fn letter_at(&self, cell: GridCell) -> Option<char> {
    self.grid.get(cell.row).and_then(|r| r.chars().nth(cell.col))
  }
}

/// Kind-specific body of an extra activity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityContent {
  TrueFalse { items: Vec<TrueFalseItem> },
  FillInTheBlank { items: Vec<FillInBlankItem> },
  SentenceOrdering {
    shuffled: Vec<String>,
    /// `correct_order[i]` is the index into `shuffled` of the i-th sentence.
    #[serde(rename = "correctOrder")]
    correct_order: Vec<usize>,
  },
  WordSearch(WordSearch),
  Riddles { items: Vec<RiddleItem> },
  Markdown { content: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExtraActivity {
  pub title: String,
  #[serde(flatten)]
  pub content: ActivityContent,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
  pub saber_questions: Vec<SaberQuestion>,
  pub matching_exercise: MatchingExercise,
  pub open_questions: Vec<String>,
  pub creative_activity: CreativeActivity,
  pub concept_map_facts: Vec<String>,
  #[serde(default)]
  pub extra_activities: Vec<ExtraActivity>,
}

/// The unit returned by the pipeline: one narrative plus its workshop.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedContent {
  pub narrative: Narrative,
  pub workshop: Workshop,
}
