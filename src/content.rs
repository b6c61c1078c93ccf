//! Content provider: subjects, age-filtered lesson lists and lesson steps.
//!
//! The catalog is built once from `ContentConfig` and never mutated afterwards,
//! so every lookup is a pure function of its inputs.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::ContentConfig;
use crate::domain::{Difficulty, LessonContent, LessonDescriptor, Subject};
use crate::seeds::{fallback_step, generated_lessons};

/// Age used for learners who have not picked one yet.
pub const DEFAULT_AGE: u32 = 5;

/// Read side the lesson engine consumes.
pub trait ContentProvider {
    /// Lessons of a subject visible at `age`, in authored order.
    fn lessons(&self, subject_id: &str, age: u32) -> Vec<LessonDescriptor>;

    /// Title and ordered steps of a lesson, or the generic fallback step.
    fn lesson_content(&self, subject_id: &str, lesson_id: u32) -> LessonContent;
}

/// Three-tier age policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeBracket {
    /// 4 and under: beginner lessons only.
    Early,
    /// 5 to 7: everything but advanced.
    Middle,
    /// 8 and over: everything.
    Older,
}

impl AgeBracket {
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=4 => AgeBracket::Early,
            5..=7 => AgeBracket::Middle,
            _ => AgeBracket::Older,
        }
    }

    pub fn admits(self, difficulty: Difficulty) -> bool {
        match self {
            AgeBracket::Early => difficulty == Difficulty::Beginner,
            AgeBracket::Middle => difficulty != Difficulty::Advanced,
            AgeBracket::Older => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContentCatalog {
    subjects: Vec<Subject>,
    lesson_tables: HashMap<String, Vec<LessonDescriptor>>,
    authored: HashMap<(String, u32), LessonContent>,
}

impl ContentCatalog {
    pub fn from_config(cfg: ContentConfig) -> Self {
        let mut subjects = Vec::with_capacity(cfg.subjects.len());
        let mut lesson_tables = HashMap::new();
        for s in cfg.subjects {
            if let Some(lessons) = s.lessons {
                lesson_tables.insert(s.id.clone(), lessons);
            }
            subjects.push(Subject { id: s.id, name: s.name, icon: s.icon });
        }

        let mut authored = HashMap::new();
        for lc in cfg.lesson_content {
            for (i, step) in lc.steps.iter().enumerate() {
                let offered = step.activity.interaction_ids().len() as u32;
                if step.required_interactions > offered {
                    warn!(target: "starsteps", subject = %lc.subject, lesson = lc.lesson, step = i + 1, required = step.required_interactions, offered, "Step target exceeds available interactions");
                }
            }
            authored.insert(
                (lc.subject, lc.lesson),
                LessonContent { title: lc.title, steps: lc.steps },
            );
        }

        info!(target: "starsteps", subjects = subjects.len(), lesson_tables = lesson_tables.len(), authored_lessons = authored.len(), "Content catalog ready");
        Self { subjects, lesson_tables, authored }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    /// Full authored (or generated) lesson list, ignoring age.
    pub fn all_lessons(&self, subject_id: &str) -> Vec<LessonDescriptor> {
        self.lesson_tables
            .get(subject_id)
            .cloned()
            .unwrap_or_else(|| generated_lessons(subject_id))
    }

    pub fn lesson(&self, subject_id: &str, lesson_id: u32) -> Option<LessonDescriptor> {
        self.all_lessons(subject_id).into_iter().find(|l| l.id == lesson_id)
    }
}

impl ContentProvider for ContentCatalog {
    fn lessons(&self, subject_id: &str, age: u32) -> Vec<LessonDescriptor> {
        let bracket = AgeBracket::for_age(age);
        self.all_lessons(subject_id)
            .into_iter()
            .filter(|l| bracket.admits(l.difficulty))
            .collect()
    }

    fn lesson_content(&self, subject_id: &str, lesson_id: u32) -> LessonContent {
        if let Some(content) = self.authored.get(&(subject_id.to_string(), lesson_id)) {
            return content.clone();
        }
        let title = self
            .lesson(subject_id, lesson_id)
            .map(|l| l.title)
            .unwrap_or_else(|| format!("Lesson {}", lesson_id));
        LessonContent { title, steps: vec![fallback_step()] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::FALLBACK_REQUIRED_INTERACTIONS;

    fn catalog() -> ContentCatalog {
        ContentCatalog::from_config(ContentConfig::embedded().expect("embedded catalog"))
    }

    fn subject_ids(c: &ContentCatalog) -> Vec<String> {
        c.subjects().iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn older_children_see_every_lesson_in_order() {
        let c = catalog();
        for subject in subject_ids(&c) {
            let all = c.all_lessons(&subject);
            for age in [8, 9, 10, 12] {
                assert_eq!(c.lessons(&subject, age), all, "subject {}", subject);
            }
        }
    }

    #[test]
    fn young_children_only_see_beginner_lessons() {
        let c = catalog();
        for subject in subject_ids(&c) {
            for age in 1..=4 {
                let lessons = c.lessons(&subject, age);
                assert!(!lessons.is_empty());
                assert!(lessons.iter().all(|l| l.difficulty == Difficulty::Beginner));
            }
        }
    }

    #[test]
    fn middle_ages_never_see_advanced_lessons() {
        let c = catalog();
        for subject in subject_ids(&c) {
            for age in 5..=7 {
                assert!(c
                    .lessons(&subject, age)
                    .iter()
                    .all(|l| l.difficulty != Difficulty::Advanced));
            }
        }
        // english: 24 authored, 7 advanced
        assert_eq!(c.lessons("english", 6).len(), 17);
    }

    #[test]
    fn unauthored_subjects_get_generated_lessons() {
        let c = catalog();
        let hindi = c.lessons("hindi", 10);
        assert_eq!(hindi.len(), 3);
        assert_eq!(hindi[0].title, "Introduction to hindi");
        assert_eq!(c.lessons("hindi", 3).len(), 2);
    }

    #[test]
    fn authored_steps_are_returned_in_order() {
        let c = catalog();
        let content = c.lesson_content("english", 1);
        assert_eq!(content.steps.len(), 3);
        let targets: Vec<u32> = content.steps.iter().map(|s| s.required_interactions).collect();
        assert_eq!(targets, [6, 6, 18]);
        assert_eq!(content, c.lesson_content("english", 1));
    }

    #[test]
    fn unauthored_lessons_fall_back_to_one_generic_step() {
        let c = catalog();
        let content = c.lesson_content("arts", 4);
        assert_eq!(content.title, "Finger Painting Adventures");
        assert_eq!(content.steps.len(), 1);
        assert_eq!(content.steps[0].required_interactions, FALLBACK_REQUIRED_INTERACTIONS);
        assert_eq!(c.lesson_content("nowhere", 99).title, "Lesson 99");
    }

    #[test]
    fn age_brackets_split_at_five_and_eight() {
        assert_eq!(AgeBracket::for_age(4), AgeBracket::Early);
        assert_eq!(AgeBracket::for_age(5), AgeBracket::Middle);
        assert_eq!(AgeBracket::for_age(7), AgeBracket::Middle);
        assert_eq!(AgeBracket::for_age(8), AgeBracket::Older);
    }
}
