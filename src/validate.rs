//! Profile validation. Runs before any external call; every violated field is reported.

use std::ops::RangeInclusive;

use serde_json::Value;

use crate::domain::{
  ActivityKind, StudentProfile, CHARACTER_COUNT, OPEN_QUESTIONS, SABER_QUESTIONS, WORD_SEARCH_SIDE,
  WORD_SEARCH_WORDS,
};
use crate::error::{FieldError, ProfileRejected};

/// Decode a profile from request JSON. A value that does not decode is reported against
/// the first top-level key whose removal lets the rest decode, so wrong types come back
/// as field errors like any other rejection.
pub fn decode_profile(value: Value) -> Result<StudentProfile, ProfileRejected> {
  let Value::Object(map) = value else {
    return Err(ProfileRejected(vec![FieldError::new("profile", "must be a JSON object")]));
  };
  let err = match serde_json::from_value::<StudentProfile>(Value::Object(map.clone())) {
    Ok(profile) => return Ok(profile),
    Err(err) => err,
  };
  let field = map
    .keys()
    .find(|key| {
      let mut rest = map.clone();
      rest.remove(key.as_str());
      serde_json::from_value::<StudentProfile>(Value::Object(rest)).is_ok()
    })
    .cloned()
    .unwrap_or_else(|| "profile".to_string());
  Err(ProfileRejected(vec![FieldError::new(field, err.to_string())]))
}

pub fn validate_profile(profile: &StudentProfile) -> Result<(), ProfileRejected> {
  let mut errors = Vec::new();

  if profile.student_name.trim().is_empty() {
    errors.push(FieldError::new("studentName", "must not be empty"));
  }
  if profile.topic.trim().is_empty() {
    errors.push(FieldError::new("topic", "must not be empty"));
  }

  check_range(&mut errors, "characterCount", profile.character_count, CHARACTER_COUNT);
  check_range(&mut errors, "saberQuestionCount", profile.saber_question_count, SABER_QUESTIONS);
  if let Some(n) = profile.open_question_count {
    check_range(&mut errors, "openQuestionCount", n, OPEN_QUESTIONS);
  }

  let mut seen: Vec<ActivityKind> = Vec::new();
  for kind in &profile.extra_activities {
    if seen.contains(kind) {
      errors.push(FieldError::new("extraActivities", format!("'{}' requested more than once", kind.title())));
    } else {
      seen.push(*kind);
    }
  }

  if let Some(ws) = &profile.word_search {
    check_range(&mut errors, "wordSearch.wordCount", ws.word_count, WORD_SEARCH_WORDS);
    check_range(&mut errors, "wordSearch.rows", ws.rows, WORD_SEARCH_SIDE);
    check_range(&mut errors, "wordSearch.columns", ws.columns, WORD_SEARCH_SIDE);
  }

  if errors.is_empty() {
    Ok(())
  } else {
    Err(ProfileRejected(errors))
  }
}

fn check_range(errors: &mut Vec<FieldError>, field: &str, value: u32, range: RangeInclusive<u32>) {
  if !range.contains(&value) {
    errors.push(FieldError::new(
      field,
      format!("must be between {} and {} (got {})", range.start(), range.end(), value),
    ));
  }
}
