//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and log include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<impl IntoResponse, AppError> {
  let learner = logic::register(&state, body).await?;
  Ok((StatusCode::CREATED, Json(learner)))
}

#[instrument(level = "info", skip(state, body), fields(kind = ?body.kind))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<Json<AccountOut>, AppError> {
  Ok(Json(logic::login(&state, &body.email, body.kind).await?))
}

#[instrument(level = "info", skip(state), fields(age = body.age))]
pub async fn http_put_age(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AgeIn>,
) -> Result<Json<AccountOut>, AppError> {
  Ok(Json(logic::select_age(&state, &id, body.age).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_link_child(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<LinkChildIn>,
) -> Result<Json<AccountOut>, AppError> {
  Ok(Json(logic::link_child(&state, &id, &body.child_email).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProgressOut>, AppError> {
  Ok(Json(logic::progress(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%q.learner_id))]
pub async fn http_get_subjects(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LearnerQuery>,
) -> Result<Json<Vec<SubjectOut>>, AppError> {
  Ok(Json(logic::list_subjects(&state, &q.learner_id).await?))
}

#[instrument(level = "info", skip(state), fields(%subject, %q.learner_id))]
pub async fn http_get_lessons(
  State(state): State<Arc<AppState>>,
  Path(subject): Path<String>,
  Query(q): Query<LearnerQuery>,
) -> Result<Json<Vec<LessonSummaryOut>>, AppError> {
  let lessons = logic::list_lessons(&state, &q.learner_id, &subject).await?;
  info!(target: "starsteps", %subject, count = lessons.len(), "HTTP lessons served");
  Ok(Json(lessons))
}

#[instrument(level = "info", skip(state, body), fields(%body.learner_id, %body.subject, lesson_id = body.lesson_id))]
pub async fn http_start_lesson(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartLessonIn>,
) -> Result<impl IntoResponse, AppError> {
  let lesson = logic::start_lesson(&state, &body.learner_id, &body.subject, body.lesson_id).await?;
  info!(target: "lesson", session = %lesson.session_id, steps = lesson.total_steps, "HTTP lesson started");
  Ok((StatusCode::CREATED, Json(lesson)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_lesson(
  State(state): State<Arc<AppState>>,
  Path(session): Path<String>,
) -> Result<Json<LessonOut>, AppError> {
  Ok(Json(logic::lesson_snapshot(&state, &session).await?))
}

#[instrument(level = "info", skip(state, body), fields(%body.element_id))]
pub async fn http_interact(
  State(state): State<Arc<AppState>>,
  Path(session): Path<String>,
  Json(body): Json<InteractIn>,
) -> Result<Json<InteractionOut>, AppError> {
  let out = logic::interact(&state, &session, &body.element_id, body.choice.as_deref()).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_advance(
  State(state): State<Arc<AppState>>,
  Path(session): Path<String>,
) -> Result<Json<AdvanceOut>, AppError> {
  let out = logic::advance(&state, &session).await?;
  info!(target: "lesson", %session, outcome = out.outcome, "HTTP advance handled");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_reset(
  State(state): State<Arc<AppState>>,
  Path(session): Path<String>,
) -> Result<Json<LessonOut>, AppError> {
  Ok(Json(logic::reset(&state, &session).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_close_lesson(
  State(state): State<Arc<AppState>>,
  Path(session): Path<String>,
) -> Result<StatusCode, AppError> {
  logic::close(&state, &session).await?;
  Ok(StatusCode::NO_CONTENT)
}
