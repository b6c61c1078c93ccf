//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. Accepted interactions additionally get a
//! `feedback` message now and a `feedback_cleared` one when it expires.
//! Sessions started over a socket are closed when that socket goes away.

use std::collections::HashSet;
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{info, error, instrument, debug};

use crate::engine::FEEDBACK_DURATION;
use crate::error::AppError;
use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

/// Expiry notice from a feedback timer: (session id, generation).
type Expiry = (String, u64);

/// Bookkeeping for one socket: the sessions it started and the latest
/// feedback it raised.
#[derive(Debug, Default)]
struct Connection {
  sessions: HashSet<String>,
  latest_feedback: Option<Expiry>,
}

impl Connection {
  /// Track an outgoing reply. Returns the feedback that needs an expiry timer.
  fn observe(&mut self, started: bool, reply: &ServerWsMessage) -> Option<Expiry> {
    match reply {
      ServerWsMessage::Lesson { lesson } if started => {
        self.sessions.insert(lesson.session_id.clone());
        None
      }
      ServerWsMessage::Interaction { result } => {
        let feedback = result
          .feedback_generation
          .map(|generation| (result.lesson.session_id.clone(), generation));
        if feedback.is_some() {
          self.latest_feedback = feedback.clone();
        }
        feedback
      }
      ServerWsMessage::Closed { session_id } => {
        self.sessions.remove(session_id);
        if self.latest_feedback.as_ref().is_some_and(|(s, _)| s == session_id) {
          self.latest_feedback = None;
        }
        None
      }
      _ => None,
    }
  }

  /// True when the expired feedback is still the latest one, which is then cleared.
  /// A newer interaction supersedes older timers.
  fn expire(&mut self, session_id: &str, generation: u64) -> bool {
    match &self.latest_feedback {
      Some((s, g)) if s == session_id && *g == generation => {
        self.latest_feedback = None;
        true
      }
      _ => false,
    }
  }

  fn take_sessions(&mut self) -> Vec<String> {
    self.sessions.drain().collect()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "starsteps", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "starsteps", "WebSocket connected");
  let (expiry_tx, mut expiry_rx) = mpsc::unbounded_channel::<Expiry>();
  let mut conn = Connection::default();

  'conn: loop {
    let replies = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => {
          let (started, reply) = match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(msg) => {
              debug!(target: "starsteps", "WS received: {:?}", &msg);
              let started = matches!(msg, ClientWsMessage::StartLesson { .. });
              (started, handle_client_ws(msg, &state).await)
            }
            Err(e) => (false, error_msg(AppError::validation(format!("Invalid JSON: {}", e)))),
          };
          let mut replies = Vec::with_capacity(2);
          let feedback = conn.observe(started, &reply);
          replies.push(reply);
          if let Some((session_id, generation)) = feedback {
            spawn_expiry(expiry_tx.clone(), session_id.clone(), generation);
            replies.push(ServerWsMessage::Feedback { session_id, generation });
          }
          replies
        }
        Some(Ok(Message::Ping(payload))) => {
          if let Err(e) = socket.send(Message::Pong(payload)).await {
            error!(target: "starsteps", error = %e, "WS pong send error");
            break 'conn;
          }
          continue;
        }
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
        Some(Ok(_)) => continue,
      },
      Some((session_id, generation)) = expiry_rx.recv() => {
        if conn.expire(&session_id, generation) {
          vec![ServerWsMessage::FeedbackCleared { session_id, generation }]
        } else {
          continue;
        }
      }
    };

    for reply in replies {
      let out = serde_json::to_string(&reply).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e), "code": "INTERNAL" }).to_string()
      });
      if let Err(e) = socket.send(Message::Text(out)).await {
        error!(target: "starsteps", error = %e, "WS send error");
        break 'conn;
      }
    }
  }

  let closed = state.close_sessions(conn.take_sessions()).await;
  info!(target: "starsteps", sessions_closed = closed, "WebSocket disconnected");
}

/// Fire-and-forget expiry timer for one feedback signal.
fn spawn_expiry(tx: mpsc::UnboundedSender<Expiry>, session_id: String, generation: u64) {
  tokio::spawn(async move {
    tokio::time::sleep(FEEDBACK_DURATION).await;
    let _ = tx.send((session_id, generation));
  });
}

fn error_msg(e: AppError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string(), code: e.code().into() }
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  let res = match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::StartLesson { learner_id, subject, lesson_id } => {
      logic::start_lesson(state, &learner_id, &subject, lesson_id).await.map(|lesson| {
        info!(target: "lesson", session = %lesson.session_id, %subject, lesson_id, "WS lesson started");
        ServerWsMessage::Lesson { lesson }
      })
    }

    ClientWsMessage::Snapshot { session_id } => {
      logic::lesson_snapshot(state, &session_id).await.map(|lesson| ServerWsMessage::Lesson { lesson })
    }

    ClientWsMessage::Interact { session_id, element_id, choice } => {
      logic::interact(state, &session_id, &element_id, choice.as_deref())
        .await
        .map(|result| ServerWsMessage::Interaction { result })
    }

    ClientWsMessage::Advance { session_id } => {
      logic::advance(state, &session_id).await.map(|out| match out.record {
        Some(record) => ServerWsMessage::Completed { record, lesson: out.lesson },
        None => ServerWsMessage::Lesson { lesson: out.lesson },
      })
    }

    ClientWsMessage::Reset { session_id } => {
      logic::reset(state, &session_id).await.map(|lesson| ServerWsMessage::Lesson { lesson })
    }

    ClientWsMessage::Close { session_id } => {
      logic::close(state, &session_id).await.map(|_| ServerWsMessage::Closed { session_id })
    }
  };
  res.unwrap_or_else(error_msg)
}
