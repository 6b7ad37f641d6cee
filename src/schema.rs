//! Response schema: one explicit data contract for the JSON the text model must return.
//!
//! The same `Schema` value is serialized into the `responseSchema` of the model request
//! and used to check the parsed response, so the description and the validation
//! cannot drift apart.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{
  ActivityKind, StudentProfile, CONCEPT_MAP_FACTS, FILL_IN_BLANK_ITEMS, FILL_IN_BLANK_OPTIONS, MATCHING_CANDIDATES,
  MATCHING_PROMPTS, ORDERING_SENTENCES, RIDDLE_ITEMS, SABER_OPTIONS, TRUE_FALSE_ITEMS, VIGNETTES,
};

/// Subset of the OpenAPI schema dialect understood by the text model.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Schema {
  Object {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
    #[serde(rename = "propertyOrdering")]
    property_ordering: Vec<String>,
  },
  Array {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    items: Box<Schema>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    min_items: Option<usize>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    max_items: Option<usize>,
  },
  String {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    variants: Option<Vec<String>>,
  },
  Boolean {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
  },
}

impl Schema {
  pub fn string() -> Self {
    Schema::String { description: None, format: None, variants: None }
  }

  pub fn boolean() -> Self {
    Schema::Boolean { description: None }
  }

  pub fn array(items: Schema) -> Self {
    Schema::Array { description: None, items: Box::new(items), min_items: None, max_items: None }
  }

  /// Object whose fields are all required.
  pub fn object(fields: Vec<(&str, Schema)>) -> Self {
    Self::object_with_optional(fields, Vec::new())
  }

  pub fn object_with_optional(required: Vec<(&str, Schema)>, optional: Vec<(&str, Schema)>) -> Self {
    let property_ordering: Vec<String> =
      required.iter().chain(optional.iter()).map(|(name, _)| name.to_string()).collect();
    let required_names: Vec<String> = required.iter().map(|(name, _)| name.to_string()).collect();
    let properties = required
      .into_iter()
      .chain(optional)
      .map(|(name, schema)| (name.to_string(), schema))
      .collect();
    Schema::Object { description: None, properties, required: required_names, property_ordering }
  }

  pub fn describe(mut self, text: impl Into<String>) -> Self {
    let text = Some(text.into());
    match &mut self {
      Schema::Object { description, .. }
      | Schema::Array { description, .. }
      | Schema::String { description, .. }
      | Schema::Boolean { description } => *description = text,
    }
    self
  }

  /// Arrays only: require exactly `n` items.
  pub fn exactly(mut self, n: usize) -> Self {
    if let Schema::Array { min_items, max_items, .. } = &mut self {
      *min_items = Some(n);
      *max_items = Some(n);
    }
    self
  }

  /// Strings only: restrict to the given values.
  pub fn one_of<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    if let Schema::String { format, variants, .. } = &mut self {
      *format = Some("enum".into());
      *variants = Some(values.into_iter().map(Into::into).collect());
    }
    self
  }

  /// Check `value` against this schema; returns every problem found, with JSON paths.
  pub fn check(&self, value: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    self.check_at(value, "$", &mut problems);
    problems
  }

  fn check_at(&self, value: &Value, path: &str, problems: &mut Vec<String>) {
    match self {
      Schema::Object { properties, required, .. } => {
        let Some(obj) = value.as_object() else {
          problems.push(format!("{path}: expected object"));
          return;
        };
        for name in required {
          if obj.get(name).map_or(true, Value::is_null) {
            problems.push(format!("{path}.{name}: missing required field"));
          }
        }
        for (name, schema) in properties {
          if let Some(v) = obj.get(name).filter(|v| !v.is_null()) {
            schema.check_at(v, &format!("{path}.{name}"), problems);
          }
        }
      }
      Schema::Array { items, min_items, max_items, .. } => {
        let Some(arr) = value.as_array() else {
          problems.push(format!("{path}: expected array"));
          return;
        };
        let len = arr.len();
        match (min_items, max_items) {
          (Some(min), Some(max)) if min == max && len != *min => {
            problems.push(format!("{path}: expected exactly {min} items, got {len}"));
          }
          _ => {
            if let Some(min) = min_items.filter(|m| len < *m) {
              problems.push(format!("{path}: expected at least {min} items, got {len}"));
            }
            if let Some(max) = max_items.filter(|m| len > *m) {
              problems.push(format!("{path}: expected at most {max} items, got {len}"));
            }
          }
        }
        for (i, v) in arr.iter().enumerate() {
          items.check_at(v, &format!("{path}[{i}]"), problems);
        }
      }
      Schema::String { variants, .. } => match value.as_str() {
        None => problems.push(format!("{path}: expected string")),
        Some(s) => {
          if let Some(allowed) = variants {
            if !allowed.iter().any(|a| a == s) {
              problems.push(format!("{path}: {s:?} is not one of the allowed values"));
            }
          }
        }
      },
      Schema::Boolean { .. } => {
        if !value.is_boolean() {
          problems.push(format!("{path}: expected boolean"));
        }
      }
    }
  }
}

/// The response contract for one profile. Counts requested in the prompt are
/// mirrored here as item bounds.
pub fn response_schema(profile: &StudentProfile) -> Schema {
  let word_count = profile.word_search_params().word_count as usize;

  let narrative = Schema::object(vec![
    ("title", Schema::string()),
    (
      "text",
      Schema::string().describe(
        "Full narrative text in markdown (**bold**, *italic*). Contains exactly the 3 placeholders \
         [VIGNETTE_1], [VIGNETTE_2] and [VIGNETTE_3] where the illustrations go.",
      ),
    ),
    (
      "imagePrompts",
      Schema::array(Schema::string()).describe(format!(
        "Exactly {VIGNETTES} descriptive scene prompts, one per placeholder, in placeholder order."
      )),
    ),
  ]);

  let saber_question = Schema::object(vec![
    ("context", Schema::string().describe("Introductory paragraph of at least 100 characters.")),
    ("question", Schema::string()),
    ("options", Schema::array(Schema::string()).exactly(SABER_OPTIONS)),
    ("correctAnswer", Schema::string().describe("Exact text of the correct option.")),
  ]);

  let matching = Schema::object(vec![
    ("columnA", Schema::array(Schema::string()).exactly(MATCHING_PROMPTS).describe("Key concepts or events of the text.")),
    (
      "columnB",
      Schema::array(Schema::string())
        .exactly(MATCHING_CANDIDATES)
        .describe("Descriptions in shuffled order; exactly one of them matches nothing."),
    ),
    (
      "answers",
      Schema::array(Schema::string())
        .exactly(MATCHING_PROMPTS)
        .describe("For each columnA item, in order, the exact columnB text it matches."),
    ),
  ]);

  let creative = Schema::object(vec![("title", Schema::string()), ("description", Schema::string())]);

  let extra_activity = Schema::object_with_optional(
    vec![(
      "title",
      Schema::string().one_of(ActivityKind::ALL.iter().map(|k| k.title())),
    )],
    vec![
      ("content", Schema::string().describe("Glossary content in markdown.")),
      (
        "trueFalse",
        Schema::array(Schema::object(vec![("statement", Schema::string()), ("isTrue", Schema::boolean())]))
          .exactly(TRUE_FALSE_ITEMS),
      ),
      (
        "fillInTheBlank",
        Schema::array(Schema::object(vec![
          ("sentence", Schema::string().describe("Sentence with one '____' gap.")),
          ("options", Schema::array(Schema::string()).exactly(FILL_IN_BLANK_OPTIONS)),
          ("answer", Schema::string().describe("Exact text of the correct option.")),
        ]))
        .exactly(FILL_IN_BLANK_ITEMS),
      ),
      (
        "sentenceOrdering",
        Schema::array(Schema::string()).exactly(ORDERING_SENTENCES).describe("Sentences in story order."),
      ),
      ("wordSearchWords", Schema::array(Schema::string()).exactly(word_count)),
      (
        "riddles",
        Schema::array(Schema::object(vec![
          ("riddle", Schema::string().describe("Riddle text; must not contain its answer.")),
          ("answer", Schema::string()),
        ]))
        .exactly(RIDDLE_ITEMS),
      ),
    ],
  );

  let workshop = Schema::object(vec![
    ("saberQuestions", Schema::array(saber_question).exactly(profile.saber_question_count as usize)),
    ("matchingExercise", matching),
    ("openQuestions", Schema::array(Schema::string()).exactly(profile.open_questions() as usize)),
    ("creativeActivity", creative),
    (
      "conceptMapFacts",
      Schema::array(Schema::string())
        .exactly(CONCEPT_MAP_FACTS)
        .describe("Real, verifiable facts from the story, in random order."),
    ),
    (
      "extraActivities",
      Schema::array(extra_activity).exactly(profile.extra_activities.len()),
    ),
  ]);

  Schema::object(vec![("narrative", narrative), ("workshop", workshop)])
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn profile() -> StudentProfile {
    serde_json::from_str(r#"{"studentName":"Ana","topic":"Volcanoes","saberQuestionCount":5}"#).unwrap()
  }

  #[test]
  fn serializes_in_model_dialect() {
    let s = Schema::object(vec![("tags", Schema::array(Schema::string().one_of(["a", "b"])).exactly(2))]);
    let v = serde_json::to_value(&s).unwrap();
    assert_eq!(v["type"], "OBJECT");
    assert_eq!(v["required"], json!(["tags"]));
    assert_eq!(v["properties"]["tags"]["type"], "ARRAY");
    assert_eq!(v["properties"]["tags"]["minItems"], 2);
    assert_eq!(v["properties"]["tags"]["items"]["enum"], json!(["a", "b"]));
    assert_eq!(v["properties"]["tags"]["items"]["format"], "enum");
  }

  #[test]
  fn check_reports_missing_fields_and_wrong_lengths() {
    let s = Schema::object_with_optional(
      vec![("name", Schema::string()), ("items", Schema::array(Schema::boolean()).exactly(2))],
      vec![("note", Schema::string())],
    );
    assert!(s.check(&json!({"name": "x", "items": [true, false]})).is_empty());

    let problems = s.check(&json!({"items": [true, 3, false]}));
    assert!(problems.contains(&"$.name: missing required field".to_string()));
    assert!(problems.contains(&"$.items: expected exactly 2 items, got 3".to_string()));
    assert!(problems.contains(&"$.items[1]: expected boolean".to_string()));

    let problems = s.check(&json!({"name": "x", "items": [true, true], "note": 5}));
    assert_eq!(problems, vec!["$.note: expected string".to_string()]);
  }

  #[test]
  fn response_schema_mirrors_profile_counts() {
    let mut p = profile();
    p.open_question_count = Some(3);
    let v = serde_json::to_value(response_schema(&p)).unwrap();
    let ws = &v["properties"]["workshop"]["properties"];
    assert_eq!(ws["saberQuestions"]["minItems"], 5);
    assert_eq!(ws["saberQuestions"]["maxItems"], 5);
    assert_eq!(ws["openQuestions"]["maxItems"], 3);
    assert_eq!(ws["extraActivities"]["maxItems"], 0);
    assert_eq!(ws["conceptMapFacts"]["maxItems"], 5);
    assert_eq!(
      ws["extraActivities"]["items"]["properties"]["title"]["enum"].as_array().map(Vec::len),
      Some(ActivityKind::ALL.len())
    );
    // Vignette prompt count is not enforced; the assembler tolerates mismatches.
    assert!(v["properties"]["narrative"]["properties"]["imagePrompts"].get("minItems").is_none());
  }
}
