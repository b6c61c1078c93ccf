//! Application state: content catalog, accounts and live lesson sessions.
//!
//! This module owns:
//!   - the immutable content catalog (built once at startup)
//!   - child and parent accounts by id; children carry a progress ledger
//!   - lesson sessions by id, each owning one `LessonAttempt`
//!
//! Lock order is sessions before accounts wherever both are held.

use std::{collections::HashMap, sync::Arc};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_content_config_from_env, ContentConfig};
use crate::content::{ContentCatalog, ContentProvider, DEFAULT_AGE};
use crate::domain::{AccountKind, LessonCompletionRecord, LessonDescriptor};
use crate::engine::{CompletionBuffer, LessonAttempt, ScoringRules};
use crate::error::AppError;
use crate::ledger::ProgressLedger;

/// Ages offered by the age selector.
pub const MIN_AGE: u32 = 2;
pub const MAX_AGE: u32 = 10;

/// Sessions untouched for this long are dropped by the reaper.
pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 30;

/// A child learner or a parent. Only children play lessons and own progress;
/// a parent may be linked to one child whose progress it can read.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: String,
    pub kind: AccountKind,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    /// Parent accounts: the child's name as given at registration.
    pub child_name: Option<String>,
    /// Parent accounts: id of the linked child account.
    pub linked_child: Option<String>,
    pub progress: ProgressLedger,
}

impl Account {
    pub fn effective_age(&self) -> u32 {
        self.age.unwrap_or(DEFAULT_AGE)
    }

    pub fn is_child(&self) -> bool {
        self.kind == AccountKind::Child
    }

    fn require_child(&self) -> Result<(), AppError> {
        if self.is_child() {
            Ok(())
        } else {
            Err(AppError::validation("only child accounts can do this"))
        }
    }
}

pub struct LessonSession {
    pub id: String,
    pub learner_id: String,
    pub child_name: String,
    pub lesson_title: String,
    pub last_active: DateTime<Utc>,
    pub attempt: LessonAttempt<CompletionBuffer>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ContentCatalog>,
    pub accounts: Arc<RwLock<HashMap<String, Account>>>,
    pub sessions: Arc<RwLock<HashMap<String, LessonSession>>>,
    pub rules: ScoringRules,
}

impl AppState {
    /// Build state from env: load the content catalog and start with empty stores.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, toml::de::Error> {
        let cfg = load_content_config_from_env()?;
        Ok(Self::from_config(cfg))
    }

    pub fn from_config(cfg: ContentConfig) -> Self {
        Self::with_catalog(ContentCatalog::from_config(cfg))
    }

    pub fn with_catalog(catalog: ContentCatalog) -> Self {
        for s in catalog.subjects() {
            let lessons = catalog.all_lessons(&s.id).len();
            info!(target: "starsteps", subject = %s.id, lessons, "Startup lesson inventory");
        }
        Self {
            catalog: Arc::new(catalog),
            accounts: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            rules: ScoringRules::default(),
        }
    }

    /// Create a child account. Emails are unique per account kind, compared case-insensitively.
    #[instrument(level = "info", skip(self))]
    pub async fn register_child(&self, name: &str, email: &str, age: Option<u32>) -> Result<Account, AppError> {
        if let Some(age) = age {
            check_age(age)?;
        }
        let mut account = new_account(AccountKind::Child, name, email)?;
        account.age = age;

        let mut accounts = self.accounts.write().await;
        ensure_unused(&accounts, &account)?;
        accounts.insert(account.id.clone(), account.clone());
        info!(target: "starsteps", id = %account.id, has_age = age.is_some(), "Child registered");
        Ok(account)
    }

    /// Create a parent account. The child is looked up by `child_email`, or
    /// by the parent's own email when none is given; an explicit email that
    /// matches no child is an error, a missing implicit one is not.
    #[instrument(level = "info", skip(self))]
    pub async fn register_parent(
        &self,
        name: &str,
        email: &str,
        child_name: Option<&str>,
        child_email: Option<&str>,
    ) -> Result<Account, AppError> {
        let mut account = new_account(AccountKind::Parent, name, email)?;

        let mut accounts = self.accounts.write().await;
        ensure_unused(&accounts, &account)?;
        let lookup = normalize_email(child_email.unwrap_or(email));
        match find_account(&accounts, &lookup, AccountKind::Child) {
            Some(child) => {
                account.linked_child = Some(child.id.clone());
                account.child_name = Some(child.name.clone());
            }
            None if child_email.is_some() => {
                return Err(AppError::not_found(format!("no child registered with {}", lookup)));
            }
            None => {}
        }
        if let Some(given) = child_name.map(str::trim).filter(|n| !n.is_empty()) {
            account.child_name = Some(given.to_string());
        }
        accounts.insert(account.id.clone(), account.clone());
        info!(target: "starsteps", id = %account.id, linked = account.linked_child.is_some(), "Parent registered");
        Ok(account)
    }

    /// Link a parent to an existing child account.
    #[instrument(level = "info", skip(self))]
    pub async fn link_child(&self, parent_id: &str, child_email: &str) -> Result<Account, AppError> {
        let mut accounts = self.accounts.write().await;
        let child = find_account(&accounts, &normalize_email(child_email), AccountKind::Child)
            .map(|c| (c.id.clone(), c.name.clone()))
            .ok_or_else(|| AppError::not_found(format!("no child registered with {}", child_email.trim())))?;
        let parent = accounts
            .get_mut(parent_id)
            .ok_or_else(|| AppError::not_found(format!("unknown account: {}", parent_id)))?;
        if parent.kind != AccountKind::Parent {
            return Err(AppError::validation("only parent accounts can link a child"));
        }
        parent.linked_child = Some(child.0);
        if parent.child_name.is_none() {
            parent.child_name = Some(child.1);
        }
        Ok(parent.clone())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn find_by_email(&self, email: &str, kind: AccountKind) -> Result<Account, AppError> {
        let email = normalize_email(email);
        find_account(&*self.accounts.read().await, &email, kind)
            .cloned()
            .ok_or_else(|| AppError::not_found("account not found, please register first"))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_account(&self, id: &str) -> Result<Account, AppError> {
        self.accounts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("unknown account: {}", id)))
    }

    /// A child account by id; parent ids are rejected.
    pub async fn get_child(&self, id: &str) -> Result<Account, AppError> {
        let account = self.get_account(id).await?;
        account.require_child()?;
        Ok(account)
    }

    /// The child whose progress this account may read: itself, or a parent's linked child.
    pub async fn progress_owner(&self, id: &str) -> Result<Account, AppError> {
        let account = self.get_account(id).await?;
        match (account.kind, &account.linked_child) {
            (AccountKind::Child, _) => Ok(account),
            (AccountKind::Parent, Some(child_id)) => self.get_account(child_id).await,
            (AccountKind::Parent, None) => Err(AppError::not_found("no child linked to this parent account")),
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn set_age(&self, id: &str, age: u32) -> Result<Account, AppError> {
        check_age(age)?;
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("unknown account: {}", id)))?;
        account.require_child()?;
        account.age = Some(age);
        Ok(account.clone())
    }

    /// Lessons of a subject visible to the learner.
    pub fn visible_lessons(&self, learner: &Account, subject_id: &str) -> Result<Vec<LessonDescriptor>, AppError> {
        if self.catalog.subject(subject_id).is_none() {
            return Err(AppError::not_found(format!("unknown subject: {}", subject_id)));
        }
        Ok(self.catalog.lessons(subject_id, learner.effective_age()))
    }

    /// Open a lesson attempt. The lesson must be visible at the learner's age.
    #[instrument(level = "info", skip(self))]
    pub async fn start_session(&self, learner_id: &str, subject_id: &str, lesson_id: u32) -> Result<String, AppError> {
        let learner = self.get_child(learner_id).await?;
        if !self.visible_lessons(&learner, subject_id)?.iter().any(|l| l.id == lesson_id) {
            return Err(AppError::not_found(format!("lesson {} is not available in {}", lesson_id, subject_id)));
        }

        let content = self.catalog.lesson_content(subject_id, lesson_id);
        let mut attempt = LessonAttempt::start(
            subject_id,
            lesson_id,
            content.steps,
            self.rules,
            CompletionBuffer::default(),
        );
        // a lesson without steps is already complete
        let early = attempt.observer_mut().drain();

        let id = Uuid::new_v4().to_string();
        let session = LessonSession {
            id: id.clone(),
            learner_id: learner.id.clone(),
            child_name: learner.name.clone(),
            lesson_title: content.title,
            last_active: Utc::now(),
            attempt,
        };
        let lesson_title = session.lesson_title.clone();
        self.sessions.write().await.insert(id.clone(), session);
        if !early.is_empty() {
            self.apply_completions(&learner.id, &lesson_title, early).await;
        }
        info!(target: "lesson", session = %id, learner = %learner.id, subject = %subject_id, lesson = lesson_id, "Lesson started");
        Ok(id)
    }

    /// Run `f` against a session while holding the sessions write lock, then
    /// move any completion records it produced into the learner's ledger.
    pub async fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut LessonSession) -> T,
    ) -> Result<(T, Vec<LessonCompletionRecord>), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::not_found(format!("unknown lesson session: {}", session_id)))?;
        session.last_active = Utc::now();
        let out = f(session);
        let completions = session.attempt.observer_mut().drain();

        let records = completions.iter().map(|(_, r)| r.clone()).collect();
        if !completions.is_empty() {
            let learner_id = session.learner_id.clone();
            let lesson_title = session.lesson_title.clone();
            self.apply_completions(&learner_id, &lesson_title, completions).await;
        }
        Ok((out, records))
    }

    pub async fn close_session(&self, session_id: &str) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("unknown lesson session: {}", session_id)))
    }

    /// Drop every listed session that still exists. Returns how many were removed.
    pub async fn close_sessions<I>(&self, session_ids: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut sessions = self.sessions.write().await;
        session_ids
            .into_iter()
            .filter(|id| sessions.remove(id).is_some())
            .count()
    }

    /// Drop sessions whose last activity is older than `max_idle` at `now`.
    pub async fn reap_idle_sessions(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.signed_duration_since(s.last_active) < max_idle);
        before - sessions.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn apply_completions(&self, learner_id: &str, lesson_title: &str, completions: Vec<(String, LessonCompletionRecord)>) {
        let mut accounts = self.accounts.write().await;
        let Some(learner) = accounts.get_mut(learner_id) else {
            warn!(target: "lesson", learner = %learner_id, "Completion for unknown learner dropped");
            return;
        };
        let now = Utc::now();
        for (subject, record) in completions {
            learner.progress.record(&subject, lesson_title, &record, now);
            info!(target: "lesson", learner = %learner_id, %subject, lesson = record.lesson_id, stars = %record.stars, "Progress updated");
        }
    }
}

/// Periodically drop idle lesson sessions (abandoned HTTP attempts, dropped sockets).
pub fn spawn_session_reaper(state: Arc<AppState>, every: std::time::Duration, max_idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        info!(target: "starsteps", every_secs = every.as_secs(), idle_minutes = max_idle.num_minutes(), "Session reaper started");
        loop {
            interval.tick().await;
            let reaped = state.reap_idle_sessions(Utc::now(), max_idle).await;
            if reaped > 0 {
                info!(target: "lesson", reaped, "Idle lesson sessions dropped");
            } else {
                debug!(target: "lesson", "No idle lesson sessions");
            }
        }
    })
}

fn new_account(kind: AccountKind, name: &str, email: &str) -> Result<Account, AppError> {
    let name = name.trim();
    let email = normalize_email(email);
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    if !email.contains('@') {
        return Err(AppError::validation(format!("invalid email: {}", email)));
    }
    Ok(Account {
        id: Uuid::new_v4().to_string(),
        kind,
        name: name.to_string(),
        email,
        age: None,
        child_name: None,
        linked_child: None,
        progress: ProgressLedger::default(),
    })
}

fn ensure_unused(accounts: &HashMap<String, Account>, account: &Account) -> Result<(), AppError> {
    if find_account(accounts, &account.email, account.kind).is_some() {
        return Err(AppError::conflict(format!("email already registered: {}", account.email)));
    }
    Ok(())
}

fn find_account<'a>(accounts: &'a HashMap<String, Account>, email: &str, kind: AccountKind) -> Option<&'a Account> {
    accounts.values().find(|a| a.kind == kind && a.email == email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_age(age: u32) -> Result<(), AppError> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(AppError::validation(format!("age must be between {} and {}", MIN_AGE, MAX_AGE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::from_config(ContentConfig::embedded().expect("embedded catalog"))
    }

    fn finish_fun_lesson(session: &mut LessonSession) {
        for id in ["🌟", "🎯", "🚀", "🏆"] {
            session.attempt.record_interaction(id, true);
        }
        session.attempt.advance();
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let s = state();
        s.register_child("Asha", "asha@example.com", Some(6)).await.unwrap();
        let err = s.register_child("Asha", " ASHA@example.com", None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn ages_outside_the_selector_are_rejected() {
        let s = state();
        let l = s.register_child("Ravi", "ravi@example.com", None).await.unwrap();
        assert!(matches!(s.set_age(&l.id, 11).await, Err(AppError::Validation(_))));
        assert_eq!(s.set_age(&l.id, 4).await.unwrap().age, Some(4));
    }

    #[tokio::test]
    async fn advanced_lessons_cannot_be_started_by_young_learners() {
        let s = state();
        let l = s.register_child("Mia", "mia@example.com", Some(4)).await.unwrap();
        // english 14 is Advanced
        assert!(s.start_session(&l.id, "english", 14).await.is_err());
        assert!(s.start_session(&l.id, "english", 1).await.is_ok());
    }

    #[tokio::test]
    async fn completing_a_lesson_writes_the_ledger() {
        let s = state();
        let l = s.register_child("Leo", "leo@example.com", Some(9)).await.unwrap();
        let sid = s.start_session(&l.id, "fun", 1).await.unwrap();
        let (_, records) = s
            .with_session(&sid, |session| {
                for id in ["🌟", "🎯", "🚀", "🏆"] {
                    session.attempt.record_interaction(id, true);
                }
                session.attempt.advance()
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let learner = s.get_account(&l.id).await.unwrap();
        assert_eq!(learner.progress.stars("fun", 1), records.first().map(|r| r.stars));
        let recent = learner.progress.recent(5);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].subject_id, "fun");
    }

    #[tokio::test]
    async fn authored_lesson_title_is_used_for_the_session() {
        let s = state();
        let l = s.register_child("Ana", "ana@example.com", Some(6)).await.unwrap();
        let sid = s.start_session(&l.id, "science", 1).await.unwrap();
        let (title, _) = s.with_session(&sid, |session| session.lesson_title.clone()).await.unwrap();
        assert_eq!(title, "Living and Non-Living Things - Nature's Wonders");
    }

    #[tokio::test]
    async fn same_email_may_hold_a_child_and_a_parent() {
        let s = state();
        let child = s.register_child("Kai", "family@example.com", Some(7)).await.unwrap();
        let parent = s.register_parent("Dana", "Family@example.com", None, None).await.unwrap();
        assert_eq!(parent.linked_child.as_deref(), Some(child.id.as_str()));
        assert_eq!(parent.child_name.as_deref(), Some("Kai"));

        let found = s.find_by_email("family@example.com", AccountKind::Parent).await.unwrap();
        assert_eq!(found.id, parent.id);
        let found = s.find_by_email("family@example.com", AccountKind::Child).await.unwrap();
        assert_eq!(found.id, child.id);

        let again = s.register_parent("Dana", "family@example.com", None, None).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn parents_read_their_childs_progress_but_cannot_play() {
        let s = state();
        let parent = s.register_parent("Sam", "sam@example.com", Some("Tia"), None).await.unwrap();
        assert!(parent.linked_child.is_none());
        assert!(matches!(s.progress_owner(&parent.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(s.start_session(&parent.id, "fun", 1).await, Err(AppError::Validation(_))));
        assert!(matches!(s.set_age(&parent.id, 6).await, Err(AppError::Validation(_))));

        let child = s.register_child("Tia", "tia@example.com", Some(6)).await.unwrap();
        let linked = s.link_child(&parent.id, "TIA@example.com").await.unwrap();
        assert_eq!(linked.linked_child.as_deref(), Some(child.id.as_str()));
        assert_eq!(linked.child_name.as_deref(), Some("Tia"));
        assert_eq!(s.progress_owner(&parent.id).await.unwrap().id, child.id);

        let missing = s.register_parent("Lou", "lou@example.com", None, Some("nobody@example.com")).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn idle_sessions_are_reaped() {
        let s = state();
        let l = s.register_child("Ola", "ola@example.com", Some(8)).await.unwrap();
        for lesson in 1..=5 {
            s.start_session(&l.id, "arts", lesson).await.unwrap();
        }
        let max_idle = Duration::minutes(DEFAULT_SESSION_IDLE_MINUTES);
        assert_eq!(s.reap_idle_sessions(Utc::now(), max_idle).await, 0);
        assert_eq!(s.session_count().await, 5);

        let later = Utc::now() + max_idle + Duration::seconds(1);
        assert_eq!(s.reap_idle_sessions(later, max_idle).await, 5);
        assert_eq!(s.session_count().await, 0);
    }

    #[tokio::test]
    async fn activity_keeps_a_session_alive() {
        let s = state();
        let l = s.register_child("Ben", "ben@example.com", Some(6)).await.unwrap();
        let stale = s.start_session(&l.id, "fun", 1).await.unwrap();
        let busy = s.start_session(&l.id, "fun", 2).await.unwrap();
        s.sessions.write().await.values_mut().for_each(|x| x.last_active -= Duration::hours(1));
        s.with_session(&busy, finish_fun_lesson).await.unwrap();

        assert_eq!(s.reap_idle_sessions(Utc::now(), Duration::minutes(30)).await, 1);
        assert!(s.with_session(&stale, |_| ()).await.is_err());
        assert!(s.with_session(&busy, |_| ()).await.is_ok());
    }

    #[tokio::test]
    async fn closing_many_sessions_skips_unknown_ids() {
        let s = state();
        let l = s.register_child("Zoe", "zoe@example.com", Some(6)).await.unwrap();
        let a = s.start_session(&l.id, "fun", 1).await.unwrap();
        let b = s.start_session(&l.id, "fun", 2).await.unwrap();
        let closed = s.close_sessions(vec![a, "gone".to_string(), b]).await;
        assert_eq!(closed, 2);
        assert_eq!(s.session_count().await, 0);
    }
}
