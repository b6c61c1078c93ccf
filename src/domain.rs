//! Domain models: subjects, lesson/step descriptors, typed activities, star ratings
//! and the completion record handed to the progress ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Difficulty tag attached to every lesson descriptor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
  Beginner,
  Intermediate,
  Advanced,
}

/// What sort of lesson this is (drives the card styling on the client).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
  Lesson,
  Quiz,
  Game,
  Creative,
  Interactive,
  Puzzle,
  Exploration,
  Project,
  Adventure,
}

/// Who an account belongs to. Login is keyed on (email, kind).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
  #[default]
  Child,
  Parent,
}

/// Subject shown on the child dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subject {
  pub id: String,
  pub name: String,
  #[serde(default)] pub icon: String,
}

/// Immutable lesson entry of a subject's lesson table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonDescriptor {
  pub id: u32,
  pub title: String,
  pub kind: LessonKind,
  pub difficulty: Difficulty,
  #[serde(default)] pub description: String,
}

/// Phonics card: a letter with its sound and an example word.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhonicsCard {
  pub letter: String,
  pub sound: String,
  pub word: String,
  #[serde(default)] pub emoji: String,
}

/// Worked example with the category it belongs to and the reason why.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleCard {
  pub item: String,
  pub category: String,
  #[serde(default)] pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortItem {
  pub item: String,
  pub category: String,
}

/// Interactive part of a step. Each kind carries its own element schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
  /// Tap each letter once.
  AlphabetIntro { letters: Vec<String> },
  /// Tap each card to hear the letter sound.
  Phonics { cards: Vec<PhonicsCard> },
  /// Trace each letter several times; ids look like `A-1`, `A-2`, ...
  LetterTracing {
    letters: Vec<String>,
    #[serde(default = "default_traces")] traces_per_letter: u32,
  },
  /// Look at each example card.
  Examples { cards: Vec<ExampleCard> },
  /// Drop every item into the bin matching its category.
  Sorting { bins: Vec<String>, items: Vec<SortItem> },
  /// Plain clickable elements.
  General { elements: Vec<String> },
}

fn default_traces() -> u32 { 3 }

impl Activity {
  /// Every interaction id a learner can trigger in this activity, in display order.
  pub fn interaction_ids(&self) -> Vec<String> {
    match self {
      Activity::AlphabetIntro { letters } => letters.clone(),
      Activity::Phonics { cards } => cards.iter().map(|c| c.letter.clone()).collect(),
      Activity::LetterTracing { letters, traces_per_letter } => letters
        .iter()
        .flat_map(|l| (1..=*traces_per_letter).map(move |n| format!("{}-{}", l, n)))
        .collect(),
      Activity::Examples { cards } => cards.iter().map(|c| c.item.clone()).collect(),
      Activity::Sorting { items, .. } => items.iter().map(|i| i.item.clone()).collect(),
      Activity::General { elements } => elements.clone(),
    }
  }

  /// Judge an interaction against this activity.
  /// Sorting needs the chosen bin; every other kind only needs a known element.
  pub fn judge(&self, element_id: &str, choice: Option<&str>) -> bool {
    match self {
      Activity::Sorting { items, .. } => items
        .iter()
        .find(|i| i.item == element_id)
        .map(|i| choice == Some(i.category.as_str()))
        .unwrap_or(false),
      _ => self.interaction_ids().iter().any(|id| id == element_id),
    }
  }
}

/// One authored step of a lesson. `content` may contain `{child_name}` and `{lesson_title}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepDescriptor {
  pub title: String,
  pub content: String,
  #[serde(default)] pub image: String,
  #[serde(default)] pub instructions: String,
  pub activity: Activity,
  pub required_interactions: u32,
}

/// Title plus ordered steps for one (subject, lesson) pair.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LessonContent {
  pub title: String,
  pub steps: Vec<StepDescriptor>,
}

/// Star rating in 1..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StarRating(u8);

impl StarRating {
  pub const ONE: StarRating = StarRating(1);
  pub const TWO: StarRating = StarRating(2);
  pub const THREE: StarRating = StarRating(3);

  pub fn get(self) -> u8 { self.0 }
}

impl fmt::Display for StarRating {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Final output of one lesson attempt.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionRecord {
  pub lesson_id: u32,
  pub stars: StarRating,
  pub points: u32,
  pub correct_answers: u32,
}
