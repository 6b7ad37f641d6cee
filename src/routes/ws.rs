//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. Replies go through a channel drained by a writer task, so
//! a generation can stream its progress stages before the final content.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, error, info, instrument};

use crate::error::WorkshopError;
use crate::logic::generate_workshop;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::validate::decode_profile;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "taller_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  info!(target: "taller_backend", "WebSocket connected");
  let (mut sink, mut stream) = socket.split();
  let (tx, mut rx) = unbounded_channel::<ServerWsMessage>();

  let writer = tokio::spawn(async move {
    while let Some(reply) = rx.recv().await {
      let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
      });
      if let Err(e) = sink.send(Message::Text(out)).await {
        error!(target: "taller_backend", error = %e, "WS send error");
        break;
      }
    }
  });

  while let Some(Ok(msg)) = stream.next().await {
    match msg {
      Message::Text(txt) => match serde_json::from_str::<ClientWsMessage>(&txt) {
        Ok(incoming) => handle_client_ws(incoming, &state, &tx).await,
        Err(e) => {
          let _ = tx.send(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) });
        }
      },
      Message::Close(_) => break,
      _ => {}
    }
  }

  drop(tx);
  let _ = writer.await;
  info!(target: "taller_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, out: &UnboundedSender<ServerWsMessage>) {
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Generate { profile } => {
      let profile = match decode_profile(profile) {
        Ok(profile) => profile,
        Err(rejected) => {
          let _ = out.send(ServerWsMessage::InvalidProfile { errors: rejected.0 });
          return;
        }
      };
      debug!(target: "taller_backend", topic = %profile.topic, "WS generate requested");
      let on_stage = |stage: &crate::assembler::RunStage| {
        let _ = out.send(ServerWsMessage::Stage { stage: stage.clone() });
      };
      match generate_workshop(state, &profile, on_stage).await {
        Ok(content) => {
          info!(target: "taller_backend", title = %content.narrative.title, "WS content delivered");
          ServerWsMessage::Content { content: Box::new(content) }
        }
        Err(WorkshopError::Invalid(rejected)) => ServerWsMessage::InvalidProfile { errors: rejected.0 },
        Err(WorkshopError::Failed(failed)) => ServerWsMessage::Error { message: failed.to_string() },
      }
    }
  };
  let _ = out.send(reply);
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use tokio::sync::mpsc::UnboundedReceiver;

  use super::*;
  use crate::assembler::RunStage;
  use crate::domain::StudentProfile;
  use crate::testing::{fake_state, profile, sample_response, FakeImages, FakeText};

  fn generate(p: &StudentProfile) -> ClientWsMessage {
    ClientWsMessage::Generate { profile: serde_json::to_value(p).unwrap() }
  }

  fn drain(rx: &mut UnboundedReceiver<ServerWsMessage>) -> Vec<ServerWsMessage> {
    let mut out = Vec::new();
    while let Ok(m) = rx.try_recv() {
      out.push(m);
    }
    out
  }

  #[tokio::test]
  async fn ping_gets_pong() {
    let state = fake_state(Arc::new(FakeText::returning("{}")), Arc::new(FakeImages::new()));
    let (tx, mut rx) = unbounded_channel();
    handle_client_ws(ClientWsMessage::Ping, &state, &tx).await;
    assert!(matches!(drain(&mut rx).as_slice(), [ServerWsMessage::Pong]));
  }

  #[tokio::test]
  async fn generate_streams_stages_then_content() {
    let p = profile(r#"{"studentName":"Ana","topic":"Volcanoes","extraActivities":["true_false"]}"#);
    let state = fake_state(
      Arc::new(FakeText::returning(sample_response(&p).to_string())),
      Arc::new(FakeImages::new()),
    );
    let (tx, mut rx) = unbounded_channel();
    handle_client_ws(generate(&p), &state, &tx).await;

    let msgs = drain(&mut rx);
    let stages: Vec<&RunStage> = msgs
      .iter()
      .filter_map(|m| match m {
        ServerWsMessage::Stage { stage } => Some(stage),
        _ => None,
      })
      .collect();
    assert_eq!(
      stages,
      vec![&RunStage::RequestingText, &RunStage::RequestingImages { count: 4 }, &RunStage::Complete]
    );
    match msgs.last() {
      Some(ServerWsMessage::Content { content }) => assert_eq!(content.workshop.extra_activities.len(), 1),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn invalid_profile_is_reported_without_stages() {
    let text = Arc::new(FakeText::returning("{}"));
    let state = fake_state(text.clone(), Arc::new(FakeImages::new()));
    let (tx, mut rx) = unbounded_channel();
    let p = profile(r#"{"studentName":"Ana","topic":"Volcanoes","wordSearch":{"wordCount":8,"rows":5,"columns":12}}"#);
    handle_client_ws(generate(&p), &state, &tx).await;

    match drain(&mut rx).as_slice() {
      [ServerWsMessage::InvalidProfile { errors }] => assert_eq!(errors[0].field, "wordSearch.rows"),
      other => panic!("unexpected {:?}", other),
    }
    assert_eq!(text.calls(), 0);
  }

  #[tokio::test]
  async fn mistyped_profile_is_reported_as_invalid_profile() {
    let text = Arc::new(FakeText::returning("{}"));
    let state = fake_state(text.clone(), Arc::new(FakeImages::new()));
    let (tx, mut rx) = unbounded_channel();
    let msg: ClientWsMessage =
      serde_json::from_str(r#"{"type":"generate","profile":{"topic":"Volcanoes","extraActivities":"riddles"}}"#).unwrap();
    handle_client_ws(msg, &state, &tx).await;

    match drain(&mut rx).as_slice() {
      [ServerWsMessage::InvalidProfile { errors }] => assert_eq!(errors[0].field, "extraActivities"),
      other => panic!("unexpected {:?}", other),
    }
    assert_eq!(text.calls(), 0);
  }

  #[tokio::test]
  async fn failure_ends_with_failed_stage_and_coarse_error() {
    let state = fake_state(Arc::new(FakeText::failing(500)), Arc::new(FakeImages::new()));
    let (tx, mut rx) = unbounded_channel();
    let p = profile(r#"{"studentName":"Ana","topic":"Volcanoes"}"#);
    handle_client_ws(generate(&p), &state, &tx).await;

    let msgs = drain(&mut rx);
    assert!(matches!(msgs[msgs.len() - 2], ServerWsMessage::Stage { stage: RunStage::Failed { .. } }));
    match msgs.last() {
      Some(ServerWsMessage::Error { message }) => assert_eq!(message, "content generation failed; please try again"),
      other => panic!("unexpected {:?}", other),
    }
  }
}
