//! Printable renditions of a generated workshop.
//!
//! `layout` paginates the content into positioned items, `pdf` draws those items,
//! and `markdown` writes a plain-text rendition. Both renditions come in a student
//! variant (answers hidden) and a teacher variant (answer lines and word-search
//! solutions shown).

pub mod layout;
pub mod markdown;
pub mod pdf;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::domain::{GeneratedContent, MatchingExercise, RiddleItem, SaberQuestion};
use crate::error::ExportError;
use crate::util::slugify;

pub const WORKSHOP_HEADING: &str = "Taller de Comprensión";
pub const COVER_HEADING: &str = "¡Portada para colorear!";
pub const SABER_HEADING: &str = "1. Preguntas tipo SABER";
pub const MATCHING_HEADING: &str = "2. Unir columnas";
pub const MATCHING_INSTRUCTIONS: &str = "Relaciona los conceptos de la Columna A con las descripciones de la Columna B.";
pub const OPEN_HEADING: &str = "3. Preguntas abiertas";
pub const CREATIVE_HEADING: &str = "4. Actividad creativa";
pub const CONCEPT_MAP_HEADING: &str = "5. Mapa conceptual o línea de tiempo";
pub const CONCEPT_MAP_INSTRUCTIONS: &str =
  "Usa estos hechos clave de la historia para crear un mapa conceptual o una línea de tiempo.";
pub const EXTRAS_HEADING: &str = "Actividades extra";
pub const TEACHER_BANNER: &str = "Versión docente (incluye respuestas)";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
  #[default]
  Student,
  Teacher,
}

impl Audience {
  pub fn label(self) -> &'static str {
    match self {
      Audience::Student => "student",
      Audience::Teacher => "teacher",
    }
  }

  pub fn shows_answers(self) -> bool {
    self == Audience::Teacher
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
  #[default]
  Pdf,
  Markdown,
}

impl ExportFormat {
  pub fn extension(self) -> &'static str {
    match self {
      ExportFormat::Pdf => "pdf",
      ExportFormat::Markdown => "md",
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      ExportFormat::Pdf => "application/pdf",
      ExportFormat::Markdown => "text/markdown; charset=utf-8",
    }
  }
}

/// `<slug(title)>-<audience>.<ext>`, falling back to `taller` for titles with no
/// usable characters.
pub fn file_name(title: &str, audience: Audience, format: ExportFormat) -> String {
  let slug = slugify(title);
  let slug = if slug.is_empty() { "taller".to_string() } else { slug };
  format!("{}-{}.{}", slug, audience.label(), format.extension())
}

#[instrument(level = "info", skip(content), fields(title = %content.narrative.title, audience = audience.label(), format = format.extension()))]
pub fn render(content: &GeneratedContent, audience: Audience, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
  let bytes = match format {
    ExportFormat::Pdf => pdf::render_pdf(content, &layout::layout(content, audience))?,
    ExportFormat::Markdown => markdown::render_markdown(content, audience).into_bytes(),
  };
  info!(target: "taller_backend", bytes = bytes.len(), "Export rendered");
  Ok(bytes)
}

/// `a)`, `b)`, ... for option lists.
pub fn option_letter(i: usize) -> char {
  (b'a' + (i % 26) as u8) as char
}

pub fn saber_answer(q: &SaberQuestion) -> String {
  match q.correct_index() {
    Some(i) => format!("Respuesta: {}) {}", option_letter(i), q.correct_answer),
    None => format!("Respuesta: {}", q.correct_answer),
  }
}

/// `Clave: 1-d, 2-a, ...` pairing column-A numbers with column-B letters.
pub fn matching_key(m: &MatchingExercise) -> String {
  let pairs: Vec<String> = m
    .answer_key()
    .iter()
    .enumerate()
    .map(|(i, b)| match b {
      Some(b) => format!("{}-{}", i + 1, option_letter(*b)),
      None => format!("{}-?", i + 1),
    })
    .collect();
  format!("Clave: {}", pairs.join(", "))
}

pub fn true_false_answer(is_true: bool) -> &'static str {
  if is_true {
    "Respuesta: Verdadero"
  } else {
    "Respuesta: Falso"
  }
}

pub fn riddle_answer(item: &RiddleItem) -> String {
  format!("Respuesta: {}", item.answer.trim())
}

/// Story order written as 1-based positions in the shuffled list.
pub fn ordering_key(correct_order: &[usize]) -> String {
  let order: Vec<String> = correct_order.iter().map(|i| (i + 1).to_string()).collect();
  format!("Orden correcto: {}", order.join(", "))
}

/// Strip the markdown emphasis the model tends to emit; keeps list dashes.
pub fn plain_line(line: &str) -> String {
  let trimmed = line.trim();
  let body = trimmed.trim_start_matches('#').trim_start();
  let (bullet, body) = match body.strip_prefix("* ").or_else(|| body.strip_prefix("- ")) {
    Some(rest) => ("- ", rest),
    None => ("", body),
  };
  format!("{}{}", bullet, body.replace("**", "").replace('*', ""))
}
