//! Markdown rendition of a workshop. Images are embedded as data URIs.

use std::fmt::Write as _;

use crate::domain::{ActivityContent, GeneratedContent, WordSearch};
use crate::narrative::{segments, Segment};

use super::*;

pub fn render_markdown(content: &GeneratedContent, audience: Audience) -> String {
  let narrative = &content.narrative;
  let workshop = &content.workshop;
  let mut md = Md { out: String::new(), audience };

  md.line(&format!("# {}", narrative.title));
  if audience.shows_answers() {
    md.line(&format!("_{}_", TEACHER_BANNER));
  }
  md.blank();
  md.line(&format!("## {}", COVER_HEADING));
  md.image("Portada", &narrative.cover_image);

  for seg in segments(&narrative.text, narrative.vignette_images.len()) {
    match seg {
      Segment::Text(t) => md.push(t),
      Segment::Vignette(i) => {
        if let Some(image) = narrative.vignette_images.get(i) {
          md.blank();
          md.image(&format!("Viñeta {}", i + 1), image);
        }
      }
    }
  }
  md.blank();

  md.line(&format!("# {}", WORKSHOP_HEADING));
  md.blank();

  md.line(&format!("## {}", SABER_HEADING));
  for (i, q) in workshop.saber_questions.iter().enumerate() {
    md.blank();
    md.line(&format!("_{}_", q.context.trim()));
    md.blank();
    md.line(&format!("**{}. {}**", i + 1, q.question));
    md.blank();
    for (j, opt) in q.options.iter().enumerate() {
      md.line(&format!("- {}) {}", option_letter(j), opt));
    }
    md.answer(&saber_answer(q));
  }
  md.blank();

  md.line(&format!("## {}", MATCHING_HEADING));
  md.blank();
  md.line(MATCHING_INSTRUCTIONS);
  md.blank();
  md.line("| Columna A | Columna B |");
  md.line("|---|---|");
  let m = &workshop.matching_exercise;
  for row in 0..m.column_a.len().max(m.column_b.len()) {
    let a = m.column_a.get(row).map(|t| format!("{}. {}", row + 1, cell(t))).unwrap_or_default();
    let b = m.column_b.get(row).map(|t| format!("{}) {}", option_letter(row), cell(t))).unwrap_or_default();
    md.line(&format!("| {} | {} |", a, b));
  }
  md.answer(&matching_key(m));
  md.blank();

  md.line(&format!("## {}", OPEN_HEADING));
  md.blank();
  for (i, q) in workshop.open_questions.iter().enumerate() {
    md.line(&format!("{}. {}", i + 1, q));
  }
  md.blank();

  md.line(&format!("## {}", CREATIVE_HEADING));
  md.blank();
  md.line(&format!("**{}**", workshop.creative_activity.title));
  md.blank();
  md.line(&workshop.creative_activity.description);
  md.blank();

  md.line(&format!("## {}", CONCEPT_MAP_HEADING));
  md.blank();
  md.line(CONCEPT_MAP_INSTRUCTIONS);
  md.blank();
  for fact in &workshop.concept_map_facts {
    md.line(&format!("- {}", fact));
  }

  if !workshop.extra_activities.is_empty() {
    md.blank();
    md.line(&format!("## {}", EXTRAS_HEADING));
    for activity in &workshop.extra_activities {
      md.blank();
      md.line(&format!("### {}", activity.title));
      md.blank();
      match &activity.content {
        ActivityContent::TrueFalse { items } => {
          for (i, item) in items.iter().enumerate() {
            md.line(&format!("{}. {} (V / F)", i + 1, item.statement));
            md.answer(true_false_answer(item.is_true));
          }
        }
        ActivityContent::FillInTheBlank { items } => {
          for (i, item) in items.iter().enumerate() {
            md.line(&format!("{}. {} _({})_", i + 1, item.sentence, item.options.join(" / ")));
            md.answer(&format!("Respuesta: {}", item.answer));
          }
        }
        ActivityContent::SentenceOrdering { shuffled, correct_order } => {
          for (i, sentence) in shuffled.iter().enumerate() {
            md.line(&format!("{}. ( ) {}", i + 1, sentence));
          }
          md.answer(&ordering_key(correct_order));
        }
        ActivityContent::WordSearch(ws) => md.word_search(ws),
        ActivityContent::Riddles { items } => {
          for (i, item) in items.iter().enumerate() {
            let verses: Vec<&str> = item.riddle.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            md.line(&format!("{}. {}", i + 1, verses.join("  \n   ")));
            md.answer(&riddle_answer(item));
          }
        }
        ActivityContent::Markdown { content } => md.line(content.trim()),
      }
    }
  }

  md.out
}

struct Md {
  out: String,
  audience: Audience,
}

impl Md {
  fn push(&mut self, text: &str) {
    self.out.push_str(text);
  }

  fn line(&mut self, text: &str) {
    self.out.push_str(text);
    self.out.push('\n');
  }

  fn blank(&mut self) {
    if !self.out.is_empty() && !self.out.ends_with("\n\n") {
      if !self.out.ends_with('\n') {
        self.out.push('\n');
      }
      self.out.push('\n');
    }
  }

  fn image(&mut self, alt: &str, b64: &str) {
    let _ = writeln!(self.out, "![{}](data:image/png;base64,{})", alt, b64.trim());
    self.out.push('\n');
  }

  fn answer(&mut self, text: &str) {
    if self.audience.shows_answers() {
      let _ = writeln!(self.out, "> **{}**", text);
    }
  }

  fn word_search(&mut self, ws: &WordSearch) {
    self.line("```");
    for row in &ws.grid {
      let spaced: Vec<String> = row.chars().map(String::from).collect();
      self.line(&spaced.join(" "));
    }
    self.line("```");
    self.blank();
    self.line(&format!("Palabras: {}", ws.words.join(", ")));
    if self.audience.shows_answers() {
      self.blank();
      for s in &ws.solutions {
        self.answer(&format!(
          "{}: fila {}, columna {} → fila {}, columna {}",
          s.word,
          s.start.row + 1,
          s.start.col + 1,
          s.end.row + 1,
          s.end.col + 1
        ));
      }
    }
  }
}

/// Table cells cannot contain pipes or newlines.
fn cell(text: &str) -> String {
  text.replace('|', "/").replace('\n', " ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{profile, sample_content, TINY_PNG};

  fn content() -> GeneratedContent {
    sample_content(&profile(
      r#"{"studentName":"Ana","topic":"Volcanoes","saberQuestionCount":3,
          "extraActivities":["true_false","word_search","glossary"]}"#,
    ))
  }

  #[test]
  fn student_markdown_hides_answers() {
    let md = render_markdown(&content(), Audience::Student);
    assert!(!md.contains("Respuesta"));
    assert!(!md.contains("Clave:"));
    assert!(!md.contains(TEACHER_BANNER));
    assert!(md.contains("## 1. Preguntas tipo SABER"));
    assert!(md.contains("- **Magma**: molten rock"));
  }

  #[test]
  fn teacher_markdown_shows_answers_and_solutions() {
    let c = content();
    let md = render_markdown(&c, Audience::Teacher);
    assert!(md.contains("> **Respuesta: b) B0**"));
    assert!(md.contains("> **Clave: 1-d, 2-a, 3-e, 4-b**"));
    assert_eq!(md.matches("> **Respuesta: Verdadero**").count() + md.matches("> **Respuesta: Falso**").count(), 5);
    let placed = c
      .workshop
      .extra_activities
      .iter()
      .find_map(|a| match &a.content {
        ActivityContent::WordSearch(ws) => Some(ws.solutions.len()),
        _ => None,
      })
      .unwrap();
    assert_eq!(md.matches(": fila ").count(), placed);
  }

  #[test]
  fn riddles_keep_their_answers_for_the_teacher() {
    let c = sample_content(&profile(r#"{"studentName":"Ana","topic":"Volcanoes","extraActivities":["riddles"]}"#));

    let student = render_markdown(&c, Audience::Student);
    assert!(student.contains("1. I sleep inside the mountain  \n   and wake up burning.\n"));
    assert!(student.contains("3. I fall like grey snow after the blast.\n"));
    assert!(!student.contains("Respuesta: Magma"));

    let teacher = render_markdown(&c, Audience::Teacher);
    assert!(teacher.contains("> **Respuesta: Magma**"));
    assert!(teacher.contains("> **Respuesta: Ash**"));
  }

  #[test]
  fn vignettes_are_inlined_at_their_markers() {
    let md = render_markdown(&content(), Audience::Student);
    let intro = md.find("Intro ").unwrap();
    let first = md.find("![Viñeta 1]").unwrap();
    let middle = md.find(" middle ").unwrap();
    let third = md.find("![Viñeta 3]").unwrap();
    assert!(intro < first && first < middle && middle < third);
    assert!(!md.contains("[VIGNETTE_"));
    assert_eq!(md.matches(&format!("base64,{}", TINY_PNG)).count(), 4);
  }
}
