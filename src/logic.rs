//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Child and parent registration, login, age selection and child linking
//!   - Subject and age-filtered lesson listings with earned stars
//!   - Driving a lesson session (interact, advance, reset) and reporting progress

use tracing::{debug, info, instrument};

use crate::content::ContentProvider;
use crate::domain::AccountKind;
use crate::engine::{Advance, Recorded};
use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;

/// Entries of the recent-activity feed shown with progress.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[instrument(level = "info", skip(state, body), fields(kind = ?body.kind, name_len = body.name.len()))]
pub async fn register(state: &AppState, body: RegisterIn) -> Result<AccountOut, AppError> {
  let account = match body.kind {
    AccountKind::Child => state.register_child(&body.name, &body.email, body.age).await?,
    AccountKind::Parent => {
      state
        .register_parent(&body.name, &body.email, body.child_name.as_deref(), body.child_email.as_deref())
        .await?
    }
  };
  Ok(to_account_out(&account))
}

#[instrument(level = "info", skip(state))]
pub async fn login(state: &AppState, email: &str, kind: AccountKind) -> Result<AccountOut, AppError> {
  let account = state.find_by_email(email, kind).await?;
  info!(target: "starsteps", id = %account.id, ?kind, "Account logged in");
  Ok(to_account_out(&account))
}

#[instrument(level = "info", skip(state))]
pub async fn select_age(state: &AppState, learner_id: &str, age: u32) -> Result<AccountOut, AppError> {
  let learner = state.set_age(learner_id, age).await?;
  Ok(to_account_out(&learner))
}

#[instrument(level = "info", skip(state))]
pub async fn link_child(state: &AppState, parent_id: &str, child_email: &str) -> Result<AccountOut, AppError> {
  let parent = state.link_child(parent_id, child_email).await?;
  info!(target: "starsteps", id = %parent.id, child = ?parent.linked_child, "Parent linked to child");
  Ok(to_account_out(&parent))
}

#[instrument(level = "info", skip(state))]
pub async fn list_subjects(state: &AppState, learner_id: &str) -> Result<Vec<SubjectOut>, AppError> {
  let learner = state.progress_owner(learner_id).await?;
  Ok(
    state
      .catalog
      .subjects()
      .iter()
      .map(|s| SubjectOut {
        id: s.id.clone(),
        name: s.name.clone(),
        icon: s.icon.clone(),
        stars: learner
          .progress
          .lessons(&s.id)
          .map(|m| m.values().map(|st| u32::from(st.get())).sum())
          .unwrap_or(0),
      })
      .collect(),
  )
}

#[instrument(level = "info", skip(state))]
pub async fn list_lessons(state: &AppState, learner_id: &str, subject_id: &str) -> Result<Vec<LessonSummaryOut>, AppError> {
  let learner = state.get_child(learner_id).await?;
  let lessons = state.visible_lessons(&learner, subject_id)?;
  debug!(target: "starsteps", subject = %subject_id, age = learner.effective_age(), count = lessons.len(), "Lessons listed");
  Ok(
    lessons
      .into_iter()
      .map(|l| to_lesson_summary(subject_id, l, &learner.progress))
      .collect(),
  )
}

/// Parent dashboard numbers: per-subject stars and completion against the
/// lessons the learner can currently see, plus recent activity. A parent id
/// resolves to the linked child.
#[instrument(level = "info", skip(state))]
pub async fn progress(state: &AppState, account_id: &str) -> Result<ProgressOut, AppError> {
  let learner = state.progress_owner(account_id).await?;
  let age = learner.effective_age();
  let subjects = state
    .catalog
    .subjects()
    .iter()
    .map(|s| learner.progress.subject_summary(&s.id, &state.catalog.lessons(&s.id, age)))
    .collect();
  Ok(ProgressOut {
    learner_id: learner.id.clone(),
    learner_name: learner.name.clone(),
    total_stars: learner.progress.total_stars(),
    lessons_completed: learner.progress.total_completed(),
    subjects,
    recent: learner.progress.recent(RECENT_ACTIVITY_LIMIT),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn start_lesson(state: &AppState, learner_id: &str, subject_id: &str, lesson_id: u32) -> Result<LessonOut, AppError> {
  let session_id = state.start_session(learner_id, subject_id, lesson_id).await?;
  lesson_snapshot(state, &session_id).await
}

pub async fn lesson_snapshot(state: &AppState, session_id: &str) -> Result<LessonOut, AppError> {
  let (out, _) = state.with_session(session_id, |s| to_lesson_out(s)).await?;
  Ok(out)
}

/// Judge the interaction against the current step's activity, then record it.
#[instrument(level = "info", skip(state, choice), fields(has_choice = choice.is_some()))]
pub async fn interact(state: &AppState, session_id: &str, element_id: &str, choice: Option<&str>) -> Result<InteractionOut, AppError> {
  let (out, _) = state
    .with_session(session_id, |s| {
      let correct = s
        .attempt
        .current_step()
        .map(|st| st.activity.judge(element_id, choice))
        .unwrap_or(false);
      let recorded = s.attempt.record_interaction(element_id, correct);
      let feedback_generation = match recorded {
        Recorded::Accepted(f) => Some(f.generation),
        _ => None,
      };
      InteractionOut {
        outcome: recorded_label(&recorded),
        accepted: recorded.is_accepted(),
        feedback_generation,
        lesson: to_lesson_out(s),
      }
    })
    .await?;
  debug!(target: "lesson", session = %session_id, outcome = out.outcome, points = out.lesson.points, "Interaction handled");
  Ok(out)
}

#[instrument(level = "info", skip(state))]
pub async fn advance(state: &AppState, session_id: &str) -> Result<AdvanceOut, AppError> {
  let ((outcome, lesson), records) = state
    .with_session(session_id, |s| {
      let outcome = s.attempt.advance();
      (outcome, to_lesson_out(s))
    })
    .await?;
  if outcome == Advance::Blocked {
    debug!(target: "lesson", session = %session_id, "Advance rejected: step target not met");
  }
  Ok(AdvanceOut {
    outcome: advance_label(&outcome),
    record: records.into_iter().next(),
    lesson,
  })
}

#[instrument(level = "info", skip(state))]
pub async fn reset(state: &AppState, session_id: &str) -> Result<LessonOut, AppError> {
  let (out, _) = state
    .with_session(session_id, |s| {
      s.attempt.reset_step();
      to_lesson_out(s)
    })
    .await?;
  Ok(out)
}

#[instrument(level = "info", skip(state))]
pub async fn close(state: &AppState, session_id: &str) -> Result<(), AppError> {
  state.close_session(session_id).await?;
  info!(target: "lesson", session = %session_id, "Lesson session closed");
  Ok(())
}
