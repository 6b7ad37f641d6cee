//! Content assembler: one text call, then a concurrent fan-out of image calls (cover
//! first, then one per vignette prompt), merged into a single `GeneratedContent`.
//!
//! Run lifecycle: idle → requesting_text → requesting_images → complete, with any
//! step able to end in failed. Failure is all-or-nothing.

use std::sync::Arc;

use futures::future::try_join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{Prompts, WorkshopConfig};
use crate::domain::{GeneratedContent, Narrative, StudentProfile, Workshop, VIGNETTES};
use crate::error::{ClientError, GenerationFailed};
use crate::generator::{ImageGenerator, TextGenerator};
use crate::narrative::marker_count;
use crate::prompt::build_request;
use crate::response::{finish_activity, parse_model_response, ModelResponse};
use crate::util::fill_template;

/// Progress of one generation run, as reported to observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RunStage {
  RequestingText,
  RequestingImages { count: usize },
  Complete,
  Failed { message: String },
}

pub struct ContentAssembler {
  text: Arc<dyn TextGenerator>,
  images: Arc<dyn ImageGenerator>,
  prompts: Prompts,
  temperature: f32,
  seed: Option<u64>,
}

impl ContentAssembler {
  pub fn new(text: Arc<dyn TextGenerator>, images: Arc<dyn ImageGenerator>, config: &WorkshopConfig) -> Self {
    Self {
      text,
      images,
      prompts: config.prompts.clone(),
      temperature: config.temperature,
      seed: config.seed,
    }
  }

  #[cfg(test)]
  pub async fn generate(&self, profile: &StudentProfile) -> Result<GeneratedContent, GenerationFailed> {
    self.generate_with_progress(profile, |_| {}).await
  }

  /// Run the whole pipeline for one profile, reporting each stage transition to `on_stage`.
  #[instrument(level = "info", skip_all, fields(run_id = %Uuid::new_v4(), topic = %profile.topic, saber = profile.saber_question_count, extras = profile.extra_activities.len()))]
  pub async fn generate_with_progress<F>(
    &self,
    profile: &StudentProfile,
    on_stage: F,
  ) -> Result<GeneratedContent, GenerationFailed>
  where
    F: Fn(&RunStage) + Send + Sync,
  {
    match self.run(profile, &on_stage).await {
      Ok(content) => {
        info!(target: "generation", title = %content.narrative.title, vignettes = content.narrative.vignette_images.len(), "Generation complete");
        on_stage(&RunStage::Complete);
        Ok(content)
      }
      Err(cause) => {
        error!(target: "generation", error = %cause, "Generation failed");
        let failed = GenerationFailed::from(cause);
        on_stage(&RunStage::Failed { message: failed.to_string() });
        Err(failed)
      }
    }
  }

  async fn run<F>(&self, profile: &StudentProfile, on_stage: &F) -> Result<GeneratedContent, ClientError>
  where
    F: Fn(&RunStage) + Send + Sync,
  {
    let request = build_request(profile, &self.prompts, self.temperature);

    on_stage(&RunStage::RequestingText);
    let raw = self.text.generate_json(&request).await?;
    let ModelResponse { narrative, workshop } = parse_model_response(&raw, &request, &profile.extra_activities)?;

    if narrative.image_prompts.len() != VIGNETTES {
      warn!(target: "generation", expected = VIGNETTES, got = narrative.image_prompts.len(), "Unexpected number of vignette prompts; generating one image per prompt");
    }

    let cover_scene = fill_template(
      &self.prompts.cover_template,
      &[
        ("title", narrative.title.as_str()),
        ("student_name", profile.student_name.trim()),
        ("topic", profile.topic.trim()),
      ],
    );
    let scenes: Vec<&str> = std::iter::once(cover_scene.as_str())
      .chain(narrative.image_prompts.iter().map(String::as_str))
      .collect();

    on_stage(&RunStage::RequestingImages { count: scenes.len() });
    let mut images = try_join_all(scenes.iter().map(|scene| self.images.generate_image(scene)))
      .await?
      .into_iter();
    let cover_image = images.next().ok_or_else(|| ClientError::NoImage { prompt: cover_scene.clone() })?;
    let vignette_images: Vec<String> = images.collect();

    let markers = marker_count(&narrative.text);
    if markers != vignette_images.len() {
      warn!(target: "generation", markers, images = vignette_images.len(), "Vignette markers and images differ; unmatched markers will be skipped");
    }

    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let word_search = profile.word_search_params();
    let extra_activities = workshop
      .extra_activities
      .into_iter()
      .filter_map(|a| finish_activity(a, word_search, profile.difficulty, &mut rng))
      .collect();

    Ok(GeneratedContent {
      narrative: Narrative {
        title: narrative.title,
        text: narrative.text,
        cover_image,
        vignette_images,
      },
      workshop: Workshop {
        saber_questions: workshop.saber_questions,
        matching_exercise: workshop.matching_exercise,
        open_questions: workshop.open_questions,
        creative_activity: workshop.creative_activity,
        concept_map_facts: workshop.concept_map_facts,
        extra_activities,
      },
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;
  use crate::domain::{ActivityContent, ActivityKind};
  use crate::testing::{profile, sample_response, FakeImages, FakeText};

  fn ana() -> StudentProfile {
    profile(r#"{"studentName":"Ana","topic":"Volcanoes","saberQuestionCount":5,"extraActivities":[]}"#)
  }

  fn assembler(text: Arc<FakeText>, images: Arc<FakeImages>) -> ContentAssembler {
    let config = WorkshopConfig { seed: Some(42), ..WorkshopConfig::default() };
    ContentAssembler::new(text, images, &config)
  }

  #[tokio::test]
  async fn volcano_scenario_produces_requested_shape() {
    let p = ana();
    let text = Arc::new(FakeText::returning(sample_response(&p).to_string()));
    let images = Arc::new(FakeImages::new());
    let content = assembler(text.clone(), images.clone()).generate(&p).await.unwrap();

    assert_eq!(content.workshop.saber_questions.len(), 5);
    assert!(content.workshop.extra_activities.is_empty());
    assert_eq!(content.narrative.vignette_images.len(), 3);
    assert_eq!(text.calls(), 1);
  }

  #[tokio::test]
  async fn cover_is_first_and_vignettes_follow_prompt_order() {
    let p = ana();
    let images = Arc::new(FakeImages::new());
    let content = assembler(Arc::new(FakeText::returning(sample_response(&p).to_string())), images.clone())
      .generate(&p)
      .await
      .unwrap();

    let scenes = images.scenes();
    assert_eq!(scenes.len(), 4);
    assert!(scenes[0].starts_with("Cover of the story titled \"Ana and the Sleeping Volcano\""));
    assert!(scenes[0].contains("Ana") && scenes[0].contains("Volcanoes"));
    assert_eq!(FakeImages::decode(&content.narrative.cover_image), scenes[0]);
    let vignettes: Vec<String> = content.narrative.vignette_images.iter().map(|b| FakeImages::decode(b)).collect();
    assert_eq!(vignettes, vec!["Ana looks at the volcano", "Ana finds lava", "Ana goes home"]);
    assert_eq!(images.max_in_flight.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn text_failure_issues_no_image_calls() {
    let images = Arc::new(FakeImages::new());
    let err = assembler(Arc::new(FakeText::failing(429)), images.clone()).generate(&ana()).await.unwrap_err();
    assert!(matches!(err.cause, ClientError::Rejected { status: 429, .. }));
    assert!(images.scenes().is_empty());
  }

  #[tokio::test]
  async fn malformed_text_issues_no_image_calls() {
    let images = Arc::new(FakeImages::new());
    let err = assembler(Arc::new(FakeText::returning("not json")), images.clone()).generate(&ana()).await.unwrap_err();
    assert!(matches!(err.cause, ClientError::MalformedJson(_)));
    assert!(images.scenes().is_empty());
  }

  #[tokio::test]
  async fn one_failed_image_fails_the_whole_run() {
    let p = ana();
    let images = Arc::new(FakeImages::failing_on("finds lava"));
    let err = assembler(Arc::new(FakeText::returning(sample_response(&p).to_string())), images)
      .generate(&p)
      .await
      .unwrap_err();
    assert!(matches!(err.cause, ClientError::NoImage { .. }));
    assert_eq!(err.to_string(), "content generation failed; please try again");
  }

  #[tokio::test]
  async fn fewer_vignette_prompts_still_complete() {
    let p = ana();
    let mut v = sample_response(&p);
    v["narrative"]["imagePrompts"] = json!(["only scene"]);
    let images = Arc::new(FakeImages::new());
    let content = assembler(Arc::new(FakeText::returning(v.to_string())), images.clone())
      .generate(&p)
      .await
      .unwrap();
    assert_eq!(images.scenes().len(), 2);
    assert_eq!(content.narrative.vignette_images.len(), 1);
  }

  #[tokio::test]
  async fn stages_are_reported_in_order() {
    let p = ana();
    let seen = Mutex::new(Vec::new());
    assembler(Arc::new(FakeText::returning(sample_response(&p).to_string())), Arc::new(FakeImages::new()))
      .generate_with_progress(&p, |s| seen.lock().unwrap().push(s.clone()))
      .await
      .unwrap();
    assert_eq!(
      seen.into_inner().unwrap(),
      vec![RunStage::RequestingText, RunStage::RequestingImages { count: 4 }, RunStage::Complete]
    );

    let seen = Mutex::new(Vec::new());
    let _ = assembler(Arc::new(FakeText::failing(500)), Arc::new(FakeImages::new()))
      .generate_with_progress(&p, |s| seen.lock().unwrap().push(s.clone()))
      .await;
    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[1], RunStage::Failed { .. }));
  }

  #[tokio::test]
  async fn extra_activities_are_finished_deterministically_with_a_seed() {
    let mut p = ana();
    p.extra_activities = vec![ActivityKind::WordSearch, ActivityKind::SentenceOrdering, ActivityKind::Glossary];
    let body = sample_response(&p).to_string();

    let a = assembler(Arc::new(FakeText::returning(body.clone())), Arc::new(FakeImages::new())).generate(&p).await.unwrap();
    let b = assembler(Arc::new(FakeText::returning(body)), Arc::new(FakeImages::new())).generate(&p).await.unwrap();
    assert_eq!(a.workshop.extra_activities, b.workshop.extra_activities);

    let kinds: Vec<&str> = a.workshop.extra_activities.iter().map(|x| x.title.as_str()).collect();
    assert_eq!(kinds, vec!["Word Search", "Sentence Ordering", "Glossary"]);
    assert!(matches!(a.workshop.extra_activities[0].content, ActivityContent::WordSearch(_)));
  }
}
