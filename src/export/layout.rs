//! A4 pagination of a `GeneratedContent` into positioned items.
//!
//! Coordinates are millimetres from the top-left corner of the page; the PDF writer
//! flips them. Text width is estimated from average glyph widths, which is enough to
//! wrap lines without measuring fonts.

use crate::domain::{ActivityContent, ExtraActivity, GeneratedContent, WordSearch};
use crate::narrative::{segments, Segment};

use super::*;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 18.0;
const FOOTER_SPACE: f32 = 14.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.35;

const BODY: f32 = 11.0;
const SMALL: f32 = 9.0;
const HEADING: f32 = 15.0;
const TITLE: f32 = 22.0;

/// Images are requested at 4:3.
const IMAGE_ASPECT: f32 = 3.0 / 4.0;
const COVER_WIDTH: f32 = CONTENT_WIDTH;
const VIGNETTE_WIDTH: f32 = 120.0;
const MAX_CELL: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Font {
  Regular,
  Bold,
  Italic,
  Mono,
}

impl Font {
  /// Average glyph advance as a fraction of the font size.
  fn advance(self) -> f32 {
    match self {
      Font::Mono => 0.6,
      Font::Bold => 0.56,
      Font::Regular | Font::Italic => 0.5,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRef {
  Cover,
  Vignette(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
  /// `y` is the text baseline.
  Text { x: f32, y: f32, size: f32, font: Font, text: String, answer: bool },
  /// `y` is the top edge; the image is fitted inside the box keeping its aspect.
  Image { image: ImageRef, x: f32, y: f32, width: f32, height: f32 },
  /// Solution stroke through a word-search word.
  Highlight { from: (f32, f32), to: (f32, f32), thickness: f32 },
  /// Thin line: writing space or separator.
  Rule { from: (f32, f32), to: (f32, f32) },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
  pub items: Vec<Item>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrintDocument {
  pub title: String,
  pub pages: Vec<Page>,
}

#[cfg(test)]
impl PrintDocument {
  pub fn items(&self) -> impl Iterator<Item = &Item> {
    self.pages.iter().flat_map(|p| p.items.iter())
  }

  pub fn answer_lines(&self) -> impl Iterator<Item = &str> {
    self.items().filter_map(|i| match i {
      Item::Text { text, answer: true, .. } => Some(text.as_str()),
      _ => None,
    })
  }
}

pub fn layout(content: &GeneratedContent, audience: Audience) -> PrintDocument {
  let mut b = Builder::new(audience);
  let narrative = &content.narrative;
  let workshop = &content.workshop;

  // Cover page.
  b.text_block(&narrative.title, TITLE, Font::Bold);
  if audience.shows_answers() {
    b.text_block(TEACHER_BANNER, SMALL, Font::Italic);
  }
  b.gap(4.0);
  b.text_block(COVER_HEADING, HEADING, Font::Bold);
  b.image(ImageRef::Cover, COVER_WIDTH);

  // Narrative with inline vignettes.
  b.new_page();
  b.text_block(&narrative.title, HEADING, Font::Bold);
  b.gap(2.0);
  for seg in segments(&narrative.text, narrative.vignette_images.len()) {
    match seg {
      Segment::Text(t) => b.markdown(t),
      Segment::Vignette(i) => b.image(ImageRef::Vignette(i), VIGNETTE_WIDTH),
    }
  }

  // Workshop.
  b.new_page();
  b.text_block(WORKSHOP_HEADING, TITLE, Font::Bold);
  b.gap(2.0);

  b.section(SABER_HEADING);
  for (i, q) in workshop.saber_questions.iter().enumerate() {
    b.text_block(&q.context, BODY, Font::Italic);
    b.text_block(&format!("{}. {}", i + 1, q.question), BODY, Font::Bold);
    for (j, opt) in q.options.iter().enumerate() {
      b.indented(&format!("{}) {}", option_letter(j), opt), BODY, Font::Regular);
    }
    b.answer(&saber_answer(q));
    b.gap(3.0);
  }

  b.section(MATCHING_HEADING);
  b.text_block(MATCHING_INSTRUCTIONS, BODY, Font::Regular);
  b.two_columns(
    &workshop.matching_exercise.column_a.iter().enumerate().map(|(i, a)| format!("{}. {}", i + 1, a)).collect::<Vec<_>>(),
    &workshop.matching_exercise.column_b.iter().enumerate().map(|(i, t)| format!("{}) {}", option_letter(i), t)).collect::<Vec<_>>(),
  );
  b.answer(&matching_key(&workshop.matching_exercise));

  b.section(OPEN_HEADING);
  for (i, q) in workshop.open_questions.iter().enumerate() {
    b.text_block(&format!("{}. {}", i + 1, q), BODY, Font::Bold);
    b.writing_lines(3);
  }

  b.section(CREATIVE_HEADING);
  b.text_block(&workshop.creative_activity.title, BODY, Font::Bold);
  b.text_block(&workshop.creative_activity.description, BODY, Font::Regular);

  b.section(CONCEPT_MAP_HEADING);
  b.text_block(CONCEPT_MAP_INSTRUCTIONS, BODY, Font::Regular);
  for fact in &workshop.concept_map_facts {
    b.indented(&format!("- {}", fact), BODY, Font::Regular);
  }

  if !workshop.extra_activities.is_empty() {
    b.section(EXTRAS_HEADING);
    for activity in &workshop.extra_activities {
      b.activity(activity);
    }
  }

  b.finish(&narrative.title)
}

struct Builder {
  audience: Audience,
  pages: Vec<Page>,
  y: f32,
}

impl Builder {
  fn new(audience: Audience) -> Self {
    Self { audience, pages: vec![Page::default()], y: MARGIN }
  }

  fn push(&mut self, item: Item) {
    if let Some(page) = self.pages.last_mut() {
      page.items.push(item);
    }
  }

  fn new_page(&mut self) {
    self.pages.push(Page::default());
    self.y = MARGIN;
  }

  /// Break the page unless `height` more millimetres fit above the footer.
  fn ensure(&mut self, height: f32) {
    if self.y + height > PAGE_HEIGHT - MARGIN - FOOTER_SPACE && self.y > MARGIN {
      self.new_page();
    }
  }

  fn gap(&mut self, mm: f32) {
    self.y += mm;
  }

  fn line(&mut self, x: f32, text: String, size: f32, font: Font, answer: bool) {
    let height = size * PT_TO_MM * LINE_SPACING;
    self.ensure(height);
    self.y += height;
    self.push(Item::Text { x, y: self.y, size, font, text, answer });
  }

  fn wrapped(&mut self, x: f32, text: &str, size: f32, font: Font, answer: bool) {
    let width = PAGE_WIDTH - MARGIN - x;
    for l in wrap(text, chars_per_line(width, size, font)) {
      self.line(x, l, size, font, answer);
    }
  }

  fn text_block(&mut self, text: &str, size: f32, font: Font) {
    for paragraph in text.lines().map(str::trim).filter(|p| !p.is_empty()) {
      self.wrapped(MARGIN, paragraph, size, font, false);
    }
  }

  fn indented(&mut self, text: &str, size: f32, font: Font) {
    self.wrapped(MARGIN + 6.0, text, size, font, false);
  }

  fn answer(&mut self, text: &str) {
    if self.audience.shows_answers() {
      self.wrapped(MARGIN + 6.0, text, BODY, Font::Bold, true);
    }
  }

  fn section(&mut self, heading: &str) {
    self.gap(5.0);
    // Keep a heading with at least a few lines of its section.
    self.ensure(HEADING * PT_TO_MM * LINE_SPACING + 4.0 * BODY * PT_TO_MM * LINE_SPACING);
    self.wrapped(MARGIN, heading, HEADING, Font::Bold, false);
    let y = self.y + 1.5;
    self.push(Item::Rule { from: (MARGIN, y), to: (PAGE_WIDTH - MARGIN, y) });
    self.gap(3.5);
  }

  /// Markdown-ish prose: emphasis dropped, blank lines become paragraph gaps.
  fn markdown(&mut self, text: &str) {
    for raw in text.lines() {
      if raw.trim().is_empty() {
        self.gap(2.0);
        continue;
      }
      let heading = raw.trim_start().starts_with('#');
      let font = if heading { Font::Bold } else { Font::Regular };
      self.wrapped(MARGIN, &plain_line(raw), BODY, font, false);
    }
  }

  fn image(&mut self, image: ImageRef, width: f32) {
    let height = width * IMAGE_ASPECT;
    self.gap(3.0);
    self.ensure(height);
    let x = (PAGE_WIDTH - width) / 2.0;
    self.push(Item::Image { image, x, y: self.y, width, height });
    self.y += height + 3.0;
  }

  fn writing_lines(&mut self, n: usize) {
    for _ in 0..n {
      self.ensure(8.0);
      self.y += 8.0;
      self.push(Item::Rule { from: (MARGIN + 6.0, self.y), to: (PAGE_WIDTH - MARGIN, self.y) });
    }
    self.gap(2.0);
  }

  fn two_columns(&mut self, left: &[String], right: &[String]) {
    let half = CONTENT_WIDTH / 2.0;
    let per_line = chars_per_line(half - 4.0, BODY, Font::Regular);
    let left: Vec<Vec<String>> = left.iter().map(|t| wrap(t, per_line)).collect();
    let right: Vec<Vec<String>> = right.iter().map(|t| wrap(t, per_line)).collect();
    let line_h = BODY * PT_TO_MM * LINE_SPACING;

    for row in 0..left.len().max(right.len()) {
      let l = left.get(row).map(Vec::as_slice).unwrap_or_default();
      let r = right.get(row).map(Vec::as_slice).unwrap_or_default();
      let lines = l.len().max(r.len());
      self.ensure(lines as f32 * line_h);
      let top = self.y;
      for (k, text) in l.iter().enumerate() {
        let y = top + (k + 1) as f32 * line_h;
        self.push(Item::Text { x: MARGIN, y, size: BODY, font: Font::Regular, text: text.clone(), answer: false });
      }
      for (k, text) in r.iter().enumerate() {
        let y = top + (k + 1) as f32 * line_h;
        self.push(Item::Text { x: MARGIN + half, y, size: BODY, font: Font::Regular, text: text.clone(), answer: false });
      }
      self.y = top + lines as f32 * line_h + 1.5;
    }
  }

  fn activity(&mut self, activity: &ExtraActivity) {
    self.gap(2.0);
    self.text_block(&activity.title, BODY + 1.0, Font::Bold);
    match &activity.content {
      ActivityContent::TrueFalse { items } => {
        for (i, item) in items.iter().enumerate() {
          self.wrapped(MARGIN, &format!("{}. {}   ( V )  ( F )", i + 1, item.statement), BODY, Font::Regular, false);
          self.answer(true_false_answer(item.is_true));
        }
      }
      ActivityContent::FillInTheBlank { items } => {
        for (i, item) in items.iter().enumerate() {
          self.wrapped(MARGIN, &format!("{}. {}", i + 1, item.sentence), BODY, Font::Regular, false);
          self.indented(&format!("Opciones: {}", item.options.join(" / ")), SMALL, Font::Italic);
          self.answer(&format!("Respuesta: {}", item.answer));
        }
      }
      ActivityContent::SentenceOrdering { shuffled, correct_order } => {
        for (i, sentence) in shuffled.iter().enumerate() {
          self.wrapped(MARGIN, &format!("{}. (   ) {}", i + 1, sentence), BODY, Font::Regular, false);
        }
        self.answer(&ordering_key(correct_order));
      }
      ActivityContent::WordSearch(ws) => self.word_search(ws),
      ActivityContent::Riddles { items } => {
        for (i, item) in items.iter().enumerate() {
          let verses = item.riddle.lines().map(str::trim).filter(|l| !l.is_empty());
          for (k, verse) in verses.enumerate() {
            if k == 0 {
              self.wrapped(MARGIN, &format!("{}. {}", i + 1, verse), BODY, Font::Regular, false);
            } else {
              self.indented(verse, BODY, Font::Regular);
            }
          }
          self.answer(&riddle_answer(item));
        }
      }
      ActivityContent::Markdown { content } => self.markdown(content),
    }
  }

  fn word_search(&mut self, ws: &WordSearch) {
    let (rows, cols) = (ws.rows(), ws.columns());
    if rows == 0 || cols == 0 {
      return;
    }
    let cell = (CONTENT_WIDTH / cols as f32).min(MAX_CELL);
    self.gap(2.0);
    self.ensure(rows as f32 * cell);
    let left = MARGIN + (CONTENT_WIDTH - cell * cols as f32) / 2.0;
    let top = self.y;
    let center = |r: usize, c: usize| (left + (c as f32 + 0.5) * cell, top + (r as f32 + 0.5) * cell);

    // Highlights first so the letters are drawn over them.
    if self.audience.shows_answers() {
      for s in &ws.solutions {
        self.push(Item::Highlight {
          from: center(s.start.row, s.start.col),
          to: center(s.end.row, s.end.col),
          thickness: cell * 0.7,
        });
      }
    }

    let size = (cell / PT_TO_MM * 0.55).min(BODY + 1.0);
    for (r, row) in ws.grid.iter().enumerate() {
      for (c, letter) in row.chars().enumerate() {
        let (cx, cy) = center(r, c);
        self.push(Item::Text {
          x: cx - size * PT_TO_MM * Font::Mono.advance() / 2.0,
          y: cy + size * PT_TO_MM * 0.35,
          size,
          font: Font::Mono,
          text: letter.to_string(),
          answer: false,
        });
      }
    }
    self.y = top + rows as f32 * cell + 3.0;
    self.wrapped(MARGIN, &format!("Palabras: {}", ws.words.join(", ")), BODY, Font::Regular, false);
  }

  /// Stamp footers now that the page count is known.
  fn finish(mut self, title: &str) -> PrintDocument {
    let total = self.pages.len();
    let mut footer_title = title.to_string();
    if self.audience.shows_answers() {
      footer_title.push_str(" (docente)");
    }
    for (i, page) in self.pages.iter_mut().enumerate() {
      page.items.push(Item::Text {
        x: MARGIN,
        y: PAGE_HEIGHT - MARGIN + 6.0,
        size: SMALL,
        font: Font::Italic,
        text: format!("{} - {}/{}", footer_title, i + 1, total),
        answer: false,
      });
    }
    PrintDocument { title: title.to_string(), pages: self.pages }
  }
}

fn chars_per_line(width: f32, size: f32, font: Font) -> usize {
  ((width / (size * PT_TO_MM * font.advance())) as usize).max(8)
}

/// Greedy word wrap on character counts; words longer than a line are split.
pub fn wrap(text: &str, max: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();
  let mut len = 0;
  for word in text.split_whitespace() {
    let mut word: Vec<char> = word.chars().collect();
    while word.len() > max {
      if len > 0 {
        lines.push(std::mem::take(&mut current));
        len = 0;
      }
      let rest = word.split_off(max);
      lines.push(word.into_iter().collect());
      word = rest;
    }
    if len > 0 && len + 1 + word.len() > max {
      lines.push(std::mem::take(&mut current));
      len = 0;
    }
    if len > 0 {
      current.push(' ');
      len += 1;
    }
    len += word.len();
    current.extend(word);
  }
  if len > 0 {
    lines.push(current);
  }
  lines
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::StudentProfile;
  use crate::testing::{profile, sample_content};

  fn full_profile() -> StudentProfile {
    profile(
      r#"{"studentName":"Ana","topic":"Volcanoes","saberQuestionCount":4,
          "extraActivities":["true_false","fill_in_the_blank","sentence_ordering","word_search","glossary"]}"#,
    )
  }

  fn images(doc: &PrintDocument) -> Vec<ImageRef> {
    doc
      .items()
      .filter_map(|i| match i {
        Item::Image { image, .. } => Some(*image),
        _ => None,
      })
      .collect()
  }

  fn highlights(doc: &PrintDocument) -> usize {
    doc.items().filter(|i| matches!(i, Item::Highlight { .. })).count()
  }

  #[test]
  fn student_variant_has_no_answers_or_highlights() {
    let content = sample_content(&full_profile());
    let doc = layout(&content, Audience::Student);
    assert_eq!(doc.answer_lines().count(), 0);
    assert_eq!(highlights(&doc), 0);
    assert!(!doc.items().any(|i| matches!(i, Item::Text { text, .. } if text.starts_with("Respuesta"))));
  }

  #[test]
  fn riddle_answers_appear_only_for_teachers() {
    let content = sample_content(&profile(r#"{"studentName":"Ana","topic":"Volcanoes","extraActivities":["riddles"]}"#));
    let texts = |doc: &PrintDocument| -> Vec<String> {
      doc
        .items()
        .filter_map(|i| match i {
          Item::Text { text, .. } => Some(text.clone()),
          _ => None,
        })
        .collect()
    };

    let student = layout(&content, Audience::Student);
    let lines = texts(&student);
    assert!(lines.contains(&"1. I sleep inside the mountain".to_string()));
    assert!(lines.contains(&"and wake up burning.".to_string()));
    assert!(!lines.iter().any(|t| t.starts_with("Respuesta: Magma")));
    assert_eq!(student.answer_lines().count(), 0);

    let teacher = layout(&content, Audience::Teacher);
    let answers: Vec<&str> = teacher.answer_lines().collect();
    assert_eq!(answers.len(), 5 + 1 + 3);
    assert!(answers.ends_with(&["Respuesta: Magma", "Respuesta: Crater", "Respuesta: Ash"]));
  }

  #[test]
  fn teacher_variant_adds_every_answer() {
    let content = sample_content(&full_profile());
    let doc = layout(&content, Audience::Teacher);
    let answers: Vec<&str> = doc.answer_lines().collect();

    // 4 SABER + matching key + 5 true/false + 5 fill-in + 1 ordering key.
    assert_eq!(answers.len(), 4 + 1 + 5 + 5 + 1);
    assert!(answers.contains(&"Respuesta: b) B0"));
    assert!(answers.iter().any(|a| a.starts_with("Clave: 1-d")));

    let ws = content
      .workshop
      .extra_activities
      .iter()
      .find_map(|a| match &a.content {
        ActivityContent::WordSearch(ws) => Some(ws),
        _ => None,
      })
      .unwrap();
    assert_eq!(highlights(&doc), ws.solutions.len());
  }

  #[test]
  fn images_follow_cover_then_marker_order() {
    let content = sample_content(&full_profile());
    let doc = layout(&content, Audience::Student);
    assert_eq!(
      images(&doc),
      vec![ImageRef::Cover, ImageRef::Vignette(0), ImageRef::Vignette(1), ImageRef::Vignette(2)]
    );
  }

  #[test]
  fn markers_without_images_are_not_placed() {
    let mut content = sample_content(&full_profile());
    content.narrative.vignette_images.truncate(2);
    let doc = layout(&content, Audience::Student);
    assert_eq!(images(&doc), vec![ImageRef::Cover, ImageRef::Vignette(0), ImageRef::Vignette(1)]);
  }

  #[test]
  fn long_narratives_paginate_and_every_page_has_a_footer() {
    let mut content = sample_content(&full_profile());
    content.narrative.text = "Lorem ipsum dolor sit amet. ".repeat(400);
    let doc = layout(&content, Audience::Student);
    let total = doc.pages.len();
    assert!(total >= 5);

    for (i, page) in doc.pages.iter().enumerate() {
      let footer = format!("- {}/{}", i + 1, total);
      assert!(page.items.iter().any(|it| matches!(it, Item::Text { text, .. } if text.ends_with(&footer))));
      for it in &page.items {
        if let Item::Text { y, .. } | Item::Image { y, .. } = it {
          assert!(*y >= 0.0 && *y <= PAGE_HEIGHT);
        }
      }
    }
  }

  #[test]
  fn workshop_without_extras_has_no_extras_section() {
    let p = profile(r#"{"studentName":"Ana","topic":"Volcanoes","extraActivities":[]}"#);
    let doc = layout(&sample_content(&p), Audience::Teacher);
    assert!(!doc.items().any(|i| matches!(i, Item::Text { text, .. } if text == EXTRAS_HEADING)));
    assert_eq!(doc.answer_lines().count(), 5 + 1);
  }

  #[test]
  fn wrap_respects_width_and_splits_long_words() {
    assert_eq!(wrap("uno dos tres cuatro", 8), vec!["uno dos", "tres", "cuatro"]);
    assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    assert!(wrap("   ", 10).is_empty());
  }
}
