//! Narrative segmentation shared by every renderer: splits the body text on
//! `[VIGNETTE_n]` markers into alternating text and image tokens.
//!
//! Marker `n` refers to vignette image `n - 1`. Markers with no matching image
//! (index 0, or beyond the images available) are dropped from the output.

use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\[VIGNETTE_(\d+)\]").expect("Invalid vignette marker regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
  Text(&'a str),
  /// Zero-based index into `vignette_images`.
  Vignette(usize),
}

/// Lazy iterator over the segments of one narrative text. Cheap to clone; iterate a
/// clone (or call `segments` again) to restart.
#[derive(Clone, Debug)]
pub struct Segments<'a> {
  text: &'a str,
  pos: usize,
  images: usize,
  pending: Option<Segment<'a>>,
  done: bool,
}

/// Segments of `text` given `images` available vignette images.
///
/// Text pieces are emitted between every pair of markers, even when empty, so a text
/// with k markers always yields k + 1 text segments.
pub fn segments(text: &str, images: usize) -> Segments<'_> {
  Segments { text, pos: 0, images, pending: None, done: false }
}

impl<'a> Iterator for Segments<'a> {
  type Item = Segment<'a>;

  fn next(&mut self) -> Option<Segment<'a>> {
    if let Some(seg) = self.pending.take() {
      return Some(seg);
    }
    if self.done {
      return None;
    }
    match MARKER.captures_at(self.text, self.pos) {
      Some(caps) => {
        let whole = caps.get(0)?;
        let before = &self.text[self.pos..whole.start()];
        self.pos = whole.end();
        let vignette = caps
          .get(1)
          .and_then(|m| m.as_str().parse::<usize>().ok())
          .and_then(|n| n.checked_sub(1))
          .filter(|i| *i < self.images);
        self.pending = vignette.map(Segment::Vignette);
        Some(Segment::Text(before))
      }
      None => {
        self.done = true;
        Some(Segment::Text(&self.text[self.pos..]))
      }
    }
  }
}

/// Number of markers in `text`, valid or not.
pub fn marker_count(text: &str) -> usize {
  MARKER.find_iter(text).count()
}

/// Body text with every marker removed.
#[cfg(test)]
pub fn strip_markers(text: &str) -> String {
  segments(text, 0)
    .filter_map(|s| match s {
      Segment::Text(t) => Some(t),
      Segment::Vignette(_) => None,
    })
    .collect()
}
