//! Fallback content used when nothing is authored for a subject or lesson.

use crate::domain::{Activity, Difficulty, LessonDescriptor, LessonKind, StepDescriptor};

/// Interaction target of the generic fallback step.
pub const FALLBACK_REQUIRED_INTERACTIONS: u32 = 4;

/// Lesson list for subjects without an authored table.
pub fn generated_lessons(subject_id: &str) -> Vec<LessonDescriptor> {
  vec![
    LessonDescriptor {
      id: 1,
      title: format!("Introduction to {}", subject_id),
      kind: LessonKind::Lesson,
      difficulty: Difficulty::Beginner,
      description: "Basic concepts and fundamentals".into(),
    },
    LessonDescriptor {
      id: 2,
      title: format!("{} Basics", subject_id),
      kind: LessonKind::Lesson,
      difficulty: Difficulty::Beginner,
      description: "Building foundational knowledge".into(),
    },
    LessonDescriptor {
      id: 3,
      title: format!("Practice {}", subject_id),
      kind: LessonKind::Lesson,
      difficulty: Difficulty::Intermediate,
      description: "Hands-on practice and application".into(),
    },
  ]
}

/// The single step played for lessons without authored content.
pub fn fallback_step() -> StepDescriptor {
  StepDescriptor {
    title: "Interactive Learning".into(),
    content: "Welcome {child_name}! Let's explore {lesson_title} together with fun activities!".into(),
    image: "📚".into(),
    instructions: "Click to interact and learn!".into(),
    activity: Activity::General {
      elements: ["🌟", "🎯", "🚀", "🏆"].iter().map(|e| e.to_string()).collect(),
    },
    required_interactions: FALLBACK_REQUIRED_INTERACTIONS,
  }
}
