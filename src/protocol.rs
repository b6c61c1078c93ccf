//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountKind, Activity, Difficulty, LessonCompletionRecord, LessonDescriptor, LessonKind,
    StarRating,
};
use crate::engine::{Advance, AttemptState, Recorded};
use crate::ledger::{CompletionEntry, ProgressLedger, SubjectProgress};
use crate::state::{Account, LessonSession};
use crate::util::fill_template;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartLesson {
        #[serde(rename = "learnerId")]
        learner_id: String,
        subject: String,
        #[serde(rename = "lessonId")]
        lesson_id: u32,
    },
    Snapshot {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Interact {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "elementId")]
        element_id: String,
        #[serde(default)]
        choice: Option<String>,
    },
    Advance {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Reset {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Close {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Lesson {
        lesson: LessonOut,
    },
    Interaction {
        result: InteractionOut,
    },
    Feedback {
        #[serde(rename = "sessionId")]
        session_id: String,
        generation: u64,
    },
    FeedbackCleared {
        #[serde(rename = "sessionId")]
        session_id: String,
        generation: u64,
    },
    Completed {
        record: LessonCompletionRecord,
        lesson: LessonOut,
    },
    Closed {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Error {
        message: String,
        code: String,
    },
}

/// Rendered step for the player.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOut {
    pub position: usize,
    pub title: String,
    pub content: String,
    pub image: String,
    pub instructions: String,
    pub activity: Activity,
    pub required_interactions: u32,
}

/// Snapshot of a lesson session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOut {
    pub session_id: String,
    pub subject_id: String,
    pub lesson_id: u32,
    pub lesson_title: String,
    pub total_steps: usize,
    pub step: Option<StepOut>,
    pub recorded: Vec<String>,
    pub step_progress: u32,
    pub can_advance: bool,
    pub points: u32,
    pub correct_answers: u32,
    pub max_points: u32,
    pub percentage: u32,
    pub completed: bool,
    pub stars: Option<StarRating>,
    pub feedback_visible: bool,
}

/// Convert a live session into the public snapshot.
pub fn to_lesson_out(s: &LessonSession) -> LessonOut {
    let a = &s.attempt;
    let rec = a.recorder();
    let step = match a.state() {
        AttemptState::InProgress(index) => a.current_step().map(|st| StepOut {
            position: index,
            title: st.title.clone(),
            content: fill_template(
                &st.content,
                &[("child_name", s.child_name.as_str()), ("lesson_title", s.lesson_title.as_str())],
            ),
            image: st.image.clone(),
            instructions: st.instructions.clone(),
            activity: st.activity.clone(),
            required_interactions: st.required_interactions,
        }),
        AttemptState::Completed(_) => None,
    };
    let step_progress = match a.current_step() {
        Some(st) if st.required_interactions > 0 => {
            ((f64::from(rec.step_count()) / f64::from(st.required_interactions)) * 100.0).round() as u32
        }
        _ => 0,
    };
    let stars = match a.state() {
        AttemptState::Completed(stars) => Some(stars),
        AttemptState::InProgress(_) => None,
    };

    LessonOut {
        session_id: s.id.clone(),
        subject_id: a.subject_id().to_string(),
        lesson_id: a.lesson_id(),
        lesson_title: s.lesson_title.clone(),
        total_steps: a.total_steps(),
        step,
        recorded: rec.step_ids(),
        step_progress,
        can_advance: a.step_satisfied(),
        points: rec.points(),
        correct_answers: rec.correct_answers(),
        max_points: a.max_points(),
        percentage: a.percentage().round() as u32,
        completed: stars.is_some(),
        stars,
        feedback_visible: rec
            .feedback()
            .map(|f| f.is_visible(std::time::Instant::now()))
            .unwrap_or(false),
    }
}

/// Result of one interaction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOut {
    pub outcome: &'static str,
    pub accepted: bool,
    pub feedback_generation: Option<u64>,
    pub lesson: LessonOut,
}

pub fn recorded_label(r: &Recorded) -> &'static str {
    match r {
        Recorded::Accepted(_) => "accepted",
        Recorded::Duplicate => "duplicate",
        Recorded::Incorrect => "incorrect",
    }
}

/// Result of an advance request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOut {
    pub outcome: &'static str,
    pub record: Option<LessonCompletionRecord>,
    pub lesson: LessonOut,
}

pub fn advance_label(a: &Advance) -> &'static str {
    match a {
        Advance::Blocked => "blocked",
        Advance::Moved(_) => "moved",
        Advance::Completed(_) => "completed",
        Advance::AlreadyCompleted => "already_completed",
    }
}

//
// HTTP request/response DTOs
//

/// Registration form. `type` defaults to a child account; parents may name
/// their child and point at the child's account email.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIn {
    pub name: String,
    pub email: String,
    #[serde(default, rename = "type")]
    pub kind: AccountKind,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub child_name: Option<String>,
    #[serde(default)]
    pub child_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: String,
    #[serde(default, rename = "type")]
    pub kind: AccountKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkChildIn {
    pub child_email: String,
}

#[derive(Debug, Deserialize)]
pub struct AgeIn {
    pub age: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOut {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AccountKind,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub child_name: Option<String>,
    pub linked_child_id: Option<String>,
    /// The client should show the age selector next.
    pub needs_age: bool,
}

pub fn to_account_out(a: &Account) -> AccountOut {
    AccountOut {
        id: a.id.clone(),
        kind: a.kind,
        name: a.name.clone(),
        email: a.email.clone(),
        age: a.age,
        child_name: a.child_name.clone(),
        linked_child_id: a.linked_child.clone(),
        needs_age: a.is_child() && a.age.is_none(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LearnerQuery {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubjectOut {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub stars: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummaryOut {
    pub id: u32,
    pub title: String,
    pub kind: LessonKind,
    pub difficulty: Difficulty,
    pub description: String,
    pub completed: bool,
    pub stars: Option<StarRating>,
}

pub fn to_lesson_summary(subject_id: &str, l: LessonDescriptor, ledger: &ProgressLedger) -> LessonSummaryOut {
    let stars = ledger.stars(subject_id, l.id);
    LessonSummaryOut {
        id: l.id,
        title: l.title,
        kind: l.kind,
        difficulty: l.difficulty,
        description: l.description,
        completed: stars.is_some(),
        stars,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub learner_id: String,
    pub learner_name: String,
    pub total_stars: u32,
    pub lessons_completed: u32,
    pub subjects: Vec<SubjectProgress>,
    /// Recent completions, newest first.
    pub recent: Vec<CompletionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StartLessonIn {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub subject: String,
    #[serde(rename = "lessonId")]
    pub lesson_id: u32,
}

#[derive(Debug, Deserialize)]
pub struct InteractIn {
    #[serde(rename = "elementId")]
    pub element_id: String,
    #[serde(default)]
    pub choice: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
