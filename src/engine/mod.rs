//! Lesson scoring and progression engine.
//!
//! A `LessonAttempt` owns the step cursor and an `InteractionRecorder`, and
//! reports to a `LessonObserver` supplied by whoever hosts the attempt.

use crate::domain::LessonCompletionRecord;

pub mod attempt;
pub mod recorder;
pub mod scoring;

pub use attempt::{Advance, AttemptState, LessonAttempt};
pub use recorder::{FeedbackSignal, InteractionRecorder, Recorded, FEEDBACK_DURATION};
pub use scoring::{ScoringRules, POINTS_PER_INTERACTION};

/// Outbound callbacks of a lesson attempt.
pub trait LessonObserver {
    /// Called exactly once per attempt, when the learner moves past the last step.
    fn on_lesson_complete(&mut self, subject_id: &str, record: LessonCompletionRecord);

    /// Called for every accepted interaction.
    fn on_interaction_recorded(&mut self) {}
}

/// Buffers completion records until the host drains them into a ledger.
#[derive(Debug, Default)]
pub struct CompletionBuffer {
    pending: Vec<(String, LessonCompletionRecord)>,
    accepted: u64,
}

impl CompletionBuffer {
    pub fn drain(&mut self) -> Vec<(String, LessonCompletionRecord)> {
        std::mem::take(&mut self.pending)
    }

    /// Accepted interactions seen over the attempt.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }
}

impl LessonObserver for CompletionBuffer {
    fn on_lesson_complete(&mut self, subject_id: &str, record: LessonCompletionRecord) {
        self.pending.push((subject_id.to_string(), record));
    }

    fn on_interaction_recorded(&mut self) {
        self.accepted += 1;
    }
}
