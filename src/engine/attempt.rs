//! Step cursor state machine for one lesson attempt.

use tracing::{debug, info};

use crate::domain::{LessonCompletionRecord, StarRating, StepDescriptor};
use crate::engine::recorder::{InteractionRecorder, Recorded};
use crate::engine::scoring::ScoringRules;
use crate::engine::LessonObserver;

/// Where the attempt is. `InProgress` carries a 1-based step index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptState {
    InProgress(usize),
    Completed(StarRating),
}

/// Result of an `advance` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The current step still needs more interactions; nothing changed.
    Blocked,
    /// Moved to the given 1-based step.
    Moved(usize),
    /// Just finished the lesson.
    Completed(StarRating),
    /// The attempt had already finished; nothing changed.
    AlreadyCompleted,
}

pub struct LessonAttempt<O: LessonObserver> {
    subject_id: String,
    lesson_id: u32,
    steps: Vec<StepDescriptor>,
    rules: ScoringRules,
    state: AttemptState,
    recorder: InteractionRecorder,
    observer: O,
}

impl<O: LessonObserver> LessonAttempt<O> {
    /// Start an attempt on the first step. A lesson without steps completes
    /// immediately with one star and no points.
    pub fn start(
        subject_id: impl Into<String>,
        lesson_id: u32,
        steps: Vec<StepDescriptor>,
        rules: ScoringRules,
        observer: O,
    ) -> Self {
        let mut attempt = Self {
            subject_id: subject_id.into(),
            lesson_id,
            steps,
            rules,
            state: AttemptState::InProgress(1),
            recorder: InteractionRecorder::new(),
            observer,
        };
        if attempt.steps.is_empty() {
            attempt.complete();
        }
        attempt
    }

    /// Record an interaction against the current step.
    pub fn record_interaction(&mut self, id: &str, is_correct: bool) -> Recorded {
        if !matches!(self.state, AttemptState::InProgress(_)) {
            return Recorded::Incorrect;
        }
        let outcome = self
            .recorder
            .record(id, is_correct, self.rules.points_per_interaction);
        if outcome.is_accepted() {
            debug!(target: "lesson", subject = %self.subject_id, lesson = self.lesson_id, %id, points = self.recorder.points(), "Interaction accepted");
            self.observer.on_interaction_recorded();
        }
        outcome
    }

    /// Move to the next step, or finish the lesson on the last one. Rejected
    /// silently while the current step's target is unmet.
    pub fn advance(&mut self) -> Advance {
        let index = match self.state {
            AttemptState::InProgress(index) => index,
            AttemptState::Completed(_) => return Advance::AlreadyCompleted,
        };
        if !self.step_satisfied() {
            return Advance::Blocked;
        }
        if index < self.steps.len() {
            self.state = AttemptState::InProgress(index + 1);
            self.recorder.clear_step();
            Advance::Moved(index + 1)
        } else {
            Advance::Completed(self.complete())
        }
    }

    /// Clear the current step's interactions. Step index and totals stay.
    pub fn reset_step(&mut self) {
        if matches!(self.state, AttemptState::InProgress(_)) {
            self.recorder.clear_step();
        }
    }

    fn complete(&mut self) -> StarRating {
        let max = self.max_points();
        let stars = self.rules.stars(self.recorder.points(), max);
        self.state = AttemptState::Completed(stars);

        let record = LessonCompletionRecord {
            lesson_id: self.lesson_id,
            stars,
            points: self.recorder.points(),
            correct_answers: self.recorder.correct_answers(),
        };
        info!(target: "lesson", subject = %self.subject_id, lesson = self.lesson_id, %stars, points = record.points, max_points = max, "Lesson completed");
        self.observer.on_lesson_complete(&self.subject_id, record);
        stars
    }

    /// True when the current step has at least its required interactions.
    pub fn step_satisfied(&self) -> bool {
        match self.current_step() {
            Some(step) => self.recorder.step_count() >= step.required_interactions,
            None => false,
        }
    }

    pub fn current_step(&self) -> Option<&StepDescriptor> {
        match self.state {
            AttemptState::InProgress(index) => self.steps.get(index - 1),
            AttemptState::Completed(_) => None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn lesson_id(&self) -> u32 {
        self.lesson_id
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn max_points(&self) -> u32 {
        self.rules.max_points(&self.steps)
    }

    pub fn percentage(&self) -> f64 {
        self.rules.percentage(self.recorder.points(), self.max_points())
    }

    pub fn recorder(&self) -> &InteractionRecorder {
        &self.recorder
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Activity;
    use crate::engine::CompletionBuffer;

    fn step(elements: &[&str], required: u32) -> StepDescriptor {
        StepDescriptor {
            title: "Step".into(),
            content: "Hello {child_name}".into(),
            image: String::new(),
            instructions: String::new(),
            activity: Activity::General {
                elements: elements.iter().map(|e| e.to_string()).collect(),
            },
            required_interactions: required,
        }
    }

    fn attempt(steps: Vec<StepDescriptor>) -> LessonAttempt<CompletionBuffer> {
        LessonAttempt::start("english", 7, steps, ScoringRules::default(), CompletionBuffer::default())
    }

    #[test]
    fn advance_is_blocked_until_target_met() {
        let mut a = attempt(vec![step(&["a", "b"], 2), step(&["c"], 1)]);
        a.record_interaction("a", true);
        assert_eq!(a.advance(), Advance::Blocked);
        assert_eq!(a.state(), AttemptState::InProgress(1));
        assert_eq!(a.recorder().step_count(), 1);

        a.record_interaction("b", true);
        assert_eq!(a.advance(), Advance::Moved(2));
        assert_eq!(a.recorder().step_count(), 0);
        assert_eq!(a.recorder().points(), 20);
    }

    #[test]
    fn perfect_run_earns_three_stars_and_full_points() {
        let (n, k) = (3usize, 4u32);
        let ids = ["w", "x", "y", "z"];
        let mut a = attempt((0..n).map(|_| step(&ids, k)).collect());
        for i in 0..n {
            for id in ids {
                a.record_interaction(id, true);
            }
            let expected = if i + 1 < n { Advance::Moved(i + 2) } else { Advance::Completed(StarRating::THREE) };
            assert_eq!(a.advance(), expected);
        }
        assert_eq!(a.recorder().points(), n as u32 * k * 10);

        let records = a.observer_mut().drain();
        assert_eq!(records.len(), 1);
        let (subject, record) = &records[0];
        assert_eq!(subject, "english");
        assert_eq!(record.lesson_id, 7);
        assert_eq!(record.stars, StarRating::THREE);
        assert_eq!(record.points, 120);
        assert_eq!(record.correct_answers, 12);
    }

    #[test]
    fn completion_fires_once() {
        let mut a = attempt(vec![step(&["a"], 1)]);
        a.record_interaction("a", true);
        assert!(matches!(a.advance(), Advance::Completed(_)));
        assert_eq!(a.advance(), Advance::AlreadyCompleted);
        assert_eq!(a.advance(), Advance::AlreadyCompleted);
        assert_eq!(a.observer_mut().drain().len(), 1);
    }

    #[test]
    fn lesson_without_steps_completes_immediately() {
        let mut a = attempt(Vec::new());
        assert_eq!(a.state(), AttemptState::Completed(StarRating::ONE));
        assert_eq!(a.max_points(), 0);
        let records = a.observer_mut().drain();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1.points, 0);
        assert_eq!(records[0].1.stars, StarRating::ONE);
        assert_eq!(a.advance(), Advance::AlreadyCompleted);
    }

    #[test]
    fn zero_target_step_is_already_satisfied() {
        let mut a = attempt(vec![step(&[], 0)]);
        assert!(a.step_satisfied());
        assert_eq!(a.advance(), Advance::Completed(StarRating::ONE));
    }

    #[test]
    fn reset_only_clears_current_step() {
        let mut a = attempt(vec![step(&["a"], 1), step(&["b", "c"], 2)]);
        a.record_interaction("a", true);
        a.advance();
        a.record_interaction("b", true);
        a.reset_step();
        assert_eq!(a.state(), AttemptState::InProgress(2));
        assert_eq!(a.recorder().step_count(), 0);
        assert_eq!(a.recorder().points(), 20);
        assert_eq!(a.recorder().correct_answers(), 2);
    }

    #[test]
    fn duplicates_do_not_reach_the_observer() {
        let mut a = attempt(vec![step(&["a", "b"], 2)]);
        a.record_interaction("a", true);
        a.record_interaction("a", true);
        a.record_interaction("b", false);
        assert_eq!(a.observer_mut().accepted(), 1);
    }

    #[test]
    fn interactions_after_completion_are_ignored() {
        let mut a = attempt(vec![step(&["a", "b"], 1)]);
        a.record_interaction("a", true);
        a.advance();
        assert_eq!(a.record_interaction("b", true), Recorded::Incorrect);
        assert_eq!(a.recorder().points(), 10);
    }
}
