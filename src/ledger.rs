//! Per-learner progress ledger: subject -> lesson id -> stars, latest write wins,
//! plus a short history of recent completions for the parent dashboard.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{LessonCompletionRecord, LessonDescriptor, StarRating};

/// Completions kept in the recent-activity feed.
pub const HISTORY_LIMIT: usize = 20;

#[derive(Clone, Debug, Default)]
pub struct ProgressLedger {
    by_subject: HashMap<String, BTreeMap<u32, StarRating>>,
    history: VecDeque<CompletionEntry>,
}

/// One line of the recent-activity feed.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub subject_id: String,
    pub lesson_id: u32,
    pub lesson_title: String,
    pub stars: StarRating,
    pub points: u32,
    pub correct_answers: u32,
    pub completed_at: DateTime<Utc>,
}

/// Dashboard line for one subject.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject_id: String,
    pub stars: u32,
    pub lessons_completed: u32,
    pub lessons_available: u32,
    pub percent: u32,
}

impl ProgressLedger {
    pub fn record(
        &mut self,
        subject_id: &str,
        lesson_title: &str,
        record: &LessonCompletionRecord,
        completed_at: DateTime<Utc>,
    ) {
        self.by_subject
            .entry(subject_id.to_string())
            .or_default()
            .insert(record.lesson_id, record.stars);

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(CompletionEntry {
            subject_id: subject_id.to_string(),
            lesson_id: record.lesson_id,
            lesson_title: lesson_title.to_string(),
            stars: record.stars,
            points: record.points,
            correct_answers: record.correct_answers,
            completed_at,
        });
    }

    /// Recent completions, newest first. Replays appear once per completion.
    pub fn recent(&self, limit: usize) -> Vec<CompletionEntry> {
        self.history.iter().rev().take(limit).cloned().collect()
    }

    pub fn stars(&self, subject_id: &str, lesson_id: u32) -> Option<StarRating> {
        self.by_subject.get(subject_id)?.get(&lesson_id).copied()
    }

    pub fn lessons(&self, subject_id: &str) -> Option<&BTreeMap<u32, StarRating>> {
        self.by_subject.get(subject_id)
    }

    /// Summarize a subject against the lessons currently available to the learner.
    /// Stars count every completed lesson; completion is measured against `available`.
    pub fn subject_summary(&self, subject_id: &str, available: &[LessonDescriptor]) -> SubjectProgress {
        let done = self.by_subject.get(subject_id);
        let stars = done
            .map(|m| m.values().map(|s| u32::from(s.get())).sum())
            .unwrap_or(0);
        let lessons_completed = available
            .iter()
            .filter(|l| done.is_some_and(|m| m.contains_key(&l.id)))
            .count() as u32;
        let lessons_available = available.len() as u32;
        let percent = if lessons_available == 0 { 0 } else { lessons_completed * 100 / lessons_available };

        SubjectProgress {
            subject_id: subject_id.to_string(),
            stars,
            lessons_completed,
            lessons_available,
            percent,
        }
    }

    pub fn total_stars(&self) -> u32 {
        self.by_subject
            .values()
            .flat_map(|m| m.values())
            .map(|s| u32::from(s.get()))
            .sum()
    }

    pub fn total_completed(&self) -> u32 {
        self.by_subject.values().map(|m| m.len() as u32).sum()
    }
}
