//! Word-search grid construction: places words in random positions and directions,
//! fills the remaining cells with random letters, and records where each word lies.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Difficulty, GridCell, WordPlacement, WordSearch};
use crate::util::fold_accent;

const FILL_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ATTEMPTS_PER_WORD: usize = 300;

const EASY: &[(isize, isize)] = &[(0, 1), (1, 0)];
const MEDIUM: &[(isize, isize)] = &[(0, 1), (1, 0), (1, 1)];
const HARD: &[(isize, isize)] = &[(0, 1), (1, 0), (1, 1), (-1, 1), (0, -1), (-1, 0), (-1, -1), (1, -1)];

pub struct WordSearchBuilder {
  rows: usize,
  cols: usize,
  directions: &'static [(isize, isize)],
}

/// Uppercase, accents folded, letters only (`Ñ` kept).
pub fn normalize_word(word: &str) -> String {
  word
    .chars()
    .map(fold_accent)
    .filter(|c| c.is_alphabetic())
    .flat_map(char::to_uppercase)
    .collect()
}

impl WordSearchBuilder {
  /// Harder levels allow diagonal and backwards words.
  pub fn new(rows: usize, cols: usize, difficulty: Difficulty) -> Self {
    let directions = match difficulty {
      Difficulty::Low => EASY,
      Difficulty::Medium => MEDIUM,
      Difficulty::High => HARD,
    };
    Self { rows, cols, directions }
  }

  /// Words that cannot be placed (too long, too crowded) are left out of the
  /// word list, so every listed word has a solution.
  pub fn build<R: Rng>(&self, words: &[String], rng: &mut R) -> WordSearch {
    let mut grid: Vec<Vec<Option<char>>> = vec![vec![None; self.cols]; self.rows];
    let mut placed_words = Vec::new();
    let mut solutions = Vec::new();

    for raw in words {
      let word = normalize_word(raw);
      let len = word.chars().count();
      if len < 2 || placed_words.contains(&word) {
        continue;
      }
      if let Some(placement) = self.place(&mut grid, &word, rng) {
        placed_words.push(word);
        solutions.push(placement);
      }
    }

    let rows = grid
      .into_iter()
      .map(|row| {
        row
          .into_iter()
          .map(|cell| cell.unwrap_or_else(|| FILL_LETTERS[rng.gen_range(0..FILL_LETTERS.len())] as char))
          .collect::<String>()
      })
      .collect();

    WordSearch { grid: rows, words: placed_words, solutions }
  }

  fn place<R: Rng>(&self, grid: &mut [Vec<Option<char>>], word: &str, rng: &mut R) -> Option<WordPlacement> {
    let letters: Vec<char> = word.chars().collect();
    let len = letters.len() as isize;

    for _ in 0..ATTEMPTS_PER_WORD {
      let &(dr, dc) = self.directions.choose(rng)?;
      let (Some(rows), Some(cols)) = (start_range(self.rows, dr, len), start_range(self.cols, dc, len)) else {
        continue;
      };
      let r0 = rng.gen_range(rows.0..=rows.1);
      let c0 = rng.gen_range(cols.0..=cols.1);

      let fits = (0..len).all(|i| {
        let (r, c) = ((r0 + dr * i) as usize, (c0 + dc * i) as usize);
        grid[r][c].map_or(true, |existing| existing == letters[i as usize])
      });
      if !fits {
        continue;
      }

      for i in 0..len {
        let (r, c) = ((r0 + dr * i) as usize, (c0 + dc * i) as usize);
        grid[r][c] = Some(letters[i as usize]);
      }
      let end = GridCell { row: (r0 + dr * (len - 1)) as usize, col: (c0 + dc * (len - 1)) as usize };
      return Some(WordPlacement {
        word: word.to_string(),
        start: GridCell { row: r0 as usize, col: c0 as usize },
        end,
      });
    }
    None
  }
}

/// Inclusive range of start positions along one axis for a word of `len` moving by `step`.
fn start_range(size: usize, step: isize, len: isize) -> Option<(isize, isize)> {
  let size = size as isize;
  match step {
    0 if size > 0 => Some((0, size - 1)),
    1 if len <= size => Some((0, size - len)),
    -1 if len <= size => Some((len - 1, size - 1)),
    _ => None,
  }
}
