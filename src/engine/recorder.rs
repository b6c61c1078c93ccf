//! Per-step interaction recording and the transient feedback signal.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// How long the "great job" acknowledgment stays visible.
pub const FEEDBACK_DURATION: Duration = Duration::from_secs(1);

/// Acknowledgment raised by an accepted interaction. A newer signal supersedes
/// an older one; only the latest generation is ever displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackSignal {
    pub generation: u64,
    pub raised_at: Instant,
}

impl FeedbackSignal {
    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < FEEDBACK_DURATION
    }
}

/// Result of one `record` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recorded {
    Accepted(FeedbackSignal),
    Duplicate,
    Incorrect,
}

impl Recorded {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Recorded::Accepted(_))
    }
}

/// Distinct ids of the current step plus totals for the whole attempt.
#[derive(Debug, Default)]
pub struct InteractionRecorder {
    step_ids: HashSet<String>,
    points: u32,
    correct_answers: u32,
    feedback: Option<FeedbackSignal>,
}

impl InteractionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interaction. Incorrect or already seen ids leave every counter untouched.
    pub fn record(&mut self, id: &str, is_correct: bool, points: u32) -> Recorded {
        if !is_correct {
            return Recorded::Incorrect;
        }
        if self.step_ids.contains(id) {
            return Recorded::Duplicate;
        }
        self.step_ids.insert(id.to_string());
        self.correct_answers += 1;
        self.points += points;

        let generation = self.feedback.map(|f| f.generation + 1).unwrap_or(1);
        let signal = FeedbackSignal { generation, raised_at: Instant::now() };
        self.feedback = Some(signal);
        Recorded::Accepted(signal)
    }

    /// Forget the current step's ids. Totals are kept.
    pub fn clear_step(&mut self) {
        self.step_ids.clear();
    }

    pub fn step_count(&self) -> u32 {
        self.step_ids.len() as u32
    }

    /// Recorded ids of the current step, sorted for stable output.
    pub fn step_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.step_ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    pub fn feedback(&self) -> Option<FeedbackSignal> {
        self.feedback
    }
}
