//! Edit session and autosave scheduler
//!
//! An [`EditSession`] holds the working copy of one day's entry and turns a
//! stream of edits into as few durable writes as possible:
//!
//! - Every edit bumps a revision counter and re-arms a trailing-edge
//!   debounce timer (2 seconds by default).
//! - At most one flush is in flight. Asking for a flush while one is running
//!   hands back that same flush; if edits landed in the meantime exactly one
//!   follow-up flush runs after it.
//! - A flush that finishes after newer edits leaves the session dirty.
//! - A failed flush keeps the content, reports the error, and waits for the
//!   next edit or an explicit save. It is never retried on its own.
//! - Switching dates saves the outgoing day first and refuses to switch if
//!   that save fails.
//!
//! Status changes are published on a `watch` channel for status indicators.

mod repository;
mod state;

pub use repository::EntryRepository;
pub use state::{FlushOutcome, FlushResult, SaveStatus, SessionError};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{self, FutureExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::date_key::EntryDate;
use crate::models::{Entry, EMPTY_CONTENT};
use crate::storage::StorageResult;

use state::{Phase, SharedFlush};

/// Working copy of one day's entry with debounced autosave
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct EditSession {
    inner: Arc<Inner>,
}

struct Inner {
    repo: Arc<dyn EntryRepository>,
    debounce: Duration,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SaveStatus>,
}

struct SessionState {
    /// The active date
    date: EntryDate,
    /// In-memory content for the active date
    content: String,
    /// Bumped on every edit; never reset
    revision: u64,
    /// Date the unsaved edits belong to
    dirty_date: Option<EntryDate>,
    /// Last persisted version of the active date, if any
    entry: Option<Entry>,
    phase: Phase,
    timer: Option<DebounceTimer>,
    timer_generation: u64,
    /// A flush was requested for edits made after the in-flight flush began
    follow_up_due: bool,
    /// Most recent flush failure; kept until a later flush succeeds
    last_error: Option<SessionError>,
}

struct DebounceTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl SessionState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}

impl EditSession {
    /// Start an empty session for `date`
    ///
    /// Use [`EditSession::open`] to pick up content that was already saved.
    pub fn new(repo: Arc<dyn EntryRepository>, date: EntryDate, debounce: Duration) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        let state = SessionState {
            date,
            content: EMPTY_CONTENT.to_string(),
            revision: 0,
            dirty_date: None,
            entry: None,
            phase: Phase::Clean,
            timer: None,
            timer_generation: 0,
            follow_up_due: false,
            last_error: None,
        };

        Self {
            inner: Arc::new(Inner {
                repo,
                debounce,
                state: Mutex::new(state),
                status_tx,
            }),
        }
    }

    /// Start a session for `date`, loading its saved content
    pub async fn open(
        repo: Arc<dyn EntryRepository>,
        date: EntryDate,
        debounce: Duration,
    ) -> Result<Self, SessionError> {
        let entry = repo
            .load_entry(&date)
            .await
            .map_err(|e| SessionError::Load {
                date: date.clone(),
                source: Arc::new(e),
            })?;

        let session = Self::new(repo, date, debounce);
        {
            let mut state = session.inner.lock();
            if let Some(entry) = entry {
                state.content = entry.content.clone();
                state.entry = Some(entry);
            }
        }
        Ok(session)
    }

    // ==================== Inspection ====================

    pub fn active_date(&self) -> EntryDate {
        self.inner.lock().date.clone()
    }

    /// Current working copy
    pub fn content(&self) -> String {
        self.inner.lock().content.clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().revision
    }

    /// Whether some edits are not yet durable
    pub fn is_dirty(&self) -> bool {
        !self.inner.lock().phase.is_clean()
    }

    /// Last persisted version of the active date
    pub fn entry(&self) -> Option<Entry> {
        self.inner.lock().entry.clone()
    }

    /// Error from the most recent flush, until a later flush succeeds
    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.lock().last_error.clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Watch the save indicator
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status_tx.subscribe()
    }

    // ==================== Edits ====================

    /// Replace the working copy and mark the active date dirty
    ///
    /// Returns the new revision. Never waits on storage.
    pub fn edit(&self, content: impl Into<String>) -> u64 {
        let mut state = self.inner.lock();
        state.content = content.into();
        let date = state.date.clone();
        self.inner.mark_dirty_locked(&mut state, date)
    }

    /// Record a change to `date` without replacing the working copy
    ///
    /// Only the active date can be marked.
    pub fn mark_dirty(&self, date: &EntryDate) -> Result<u64, SessionError> {
        let mut state = self.inner.lock();
        if *date != state.date {
            return Err(SessionError::InactiveDate {
                date: date.clone(),
                active: state.date.clone(),
            });
        }
        Ok(self.inner.mark_dirty_locked(&mut state, date.clone()))
    }

    // ==================== Flush triggers ====================

    /// Flush now, or join the flush already in flight
    pub async fn flush_now(&self) -> FlushResult {
        let flush = {
            let mut state = self.inner.lock();
            self.inner.request_flush(&mut state)
        };
        flush.await
    }

    /// Editor lost focus
    pub async fn blur(&self) -> FlushResult {
        self.flush_now().await
    }

    /// Explicit save: keep flushing until every edit so far is durable
    pub async fn save(&self) -> Result<Option<Entry>, SessionError> {
        self.settle().await?;
        Ok(self.entry())
    }

    /// Make the active date durable, creating its entry if it was never saved
    ///
    /// Used before attaching history records to the entry.
    pub async fn ensure_saved(&self) -> Result<Entry, SessionError> {
        loop {
            self.settle().await?;

            {
                let mut state = self.inner.lock();
                if !state.phase.is_clean() {
                    continue;
                }
                let saved = state
                    .entry
                    .as_ref()
                    .filter(|entry| entry.entry_date == state.date)
                    .cloned();
                if let Some(entry) = saved {
                    return Ok(entry);
                }
                // Never persisted: save the working copy as it is.
                let date = state.date.clone();
                self.inner.mark_dirty_locked(&mut state, date);
            }
        }
    }

    /// Save the outgoing date, then load `date`
    ///
    /// If the save fails the switch is aborted and the session keeps showing
    /// the unsaved content of the current date.
    pub async fn switch_date(&self, date: EntryDate) -> Result<(), SessionError> {
        let from = self.active_date();
        if from == date {
            return Ok(());
        }

        loop {
            if let Err(e) = self.settle().await {
                warn!("Not switching from {} to {}: {}", from, date, e);
                return Err(SessionError::SwitchAborted {
                    from,
                    to: date,
                    source: Box::new(e),
                });
            }

            let loaded = self
                .inner
                .repo
                .load_entry(&date)
                .await
                .map_err(|e| SessionError::Load {
                    date: date.clone(),
                    source: Arc::new(e),
                })?;

            let installed = {
                let mut state = self.inner.lock();
                // An edit that landed during the load has to be saved first.
                if state.phase.is_clean() {
                    state.cancel_timer();
                    state.date = date.clone();
                    state.content = loaded
                        .as_ref()
                        .map(|entry| entry.content.clone())
                        .unwrap_or_else(|| EMPTY_CONTENT.to_string());
                    state.entry = loaded;
                    state.dirty_date = None;
                    state.follow_up_due = false;
                    self.inner.set_status(SaveStatus::Idle);
                    true
                } else {
                    false
                }
            };

            if installed {
                debug!("Switched active date from {} to {}", from, date);
                return Ok(());
            }
        }
    }

    /// Save everything and stop the debounce timer
    pub async fn close(&self) -> Result<(), SessionError> {
        self.settle().await?;
        self.inner.lock().cancel_timer();
        Ok(())
    }

    /// Flush until clean, joining in-flight flushes along the way
    async fn settle(&self) -> Result<(), SessionError> {
        loop {
            let flush = {
                let mut state = self.inner.lock();
                if state.phase.is_clean() {
                    return Ok(());
                }
                self.inner.request_flush(&mut state)
            };
            flush.await?;
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a status, waking subscribers only on an actual change
    fn set_status(&self, status: SaveStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    fn mark_dirty_locked(self: &Arc<Self>, state: &mut SessionState, date: EntryDate) -> u64 {
        state.revision += 1;
        state.dirty_date = Some(date);

        match state.phase {
            Phase::Clean | Phase::Failed { .. } => {
                state.phase = Phase::Dirty;
                // An unresolved failure stays on the indicator until a save lands.
                if state.last_error.is_none() {
                    self.set_status(SaveStatus::Idle);
                }
            }
            Phase::Dirty | Phase::Saving { .. } => {}
        }

        self.arm_timer(state);
        state.revision
    }

    /// Restart the quiet window
    fn arm_timer(self: &Arc<Self>, state: &mut SessionState) {
        state.cancel_timer();
        state.timer_generation += 1;

        let generation = state.timer_generation;
        let debounce = self.debounce;
        let weak: Weak<Inner> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.lock();
            if state.timer.as_ref().map(|t| t.generation) != Some(generation) {
                return;
            }
            state.timer = None;
            // The flush drives itself; nothing to await here.
            drop(inner.request_flush(&mut state));
        });

        state.timer = Some(DebounceTimer { generation, handle });
    }

    /// Coalescing entry point for every flush trigger
    fn request_flush(self: &Arc<Self>, state: &mut SessionState) -> SharedFlush {
        if let Phase::Saving { revision, flush } = &state.phase {
            let (in_flight, flush) = (*revision, flush.clone());
            if state.revision > in_flight {
                state.follow_up_due = true;
            }
            return flush;
        }

        if state.phase.is_clean() {
            return future::ready(Ok(FlushOutcome::Clean)).boxed().shared();
        }

        // Dirty, or Failed and asked to retry
        self.start_flush(state)
    }

    fn start_flush(self: &Arc<Self>, state: &mut SessionState) -> SharedFlush {
        let date = state
            .dirty_date
            .clone()
            .unwrap_or_else(|| state.date.clone());
        let content = state.content.clone();
        let revision = state.revision;

        // This flush covers every edit so far.
        state.cancel_timer();
        state.follow_up_due = false;

        let inner = Arc::clone(self);
        let flush = async move {
            debug!("Flushing {} at revision {}", date, revision);
            let result = inner.repo.save_entry(&date, &content).await;
            inner.finish_flush(date, revision, result)
        }
        .boxed()
        .shared();

        state.phase = Phase::Saving {
            revision,
            flush: flush.clone(),
        };
        self.set_status(SaveStatus::Saving);

        // Run to completion even if every caller stops waiting.
        tokio::spawn(flush.clone());
        flush
    }

    fn finish_flush(
        self: &Arc<Self>,
        date: EntryDate,
        revision: u64,
        result: StorageResult<Entry>,
    ) -> FlushResult {
        let mut state = self.lock();

        match result {
            Ok(entry) => {
                state.last_error = None;
                if state.date == date {
                    state.entry = Some(entry.clone());
                }

                let stale = state.revision != revision;
                if stale {
                    state.phase = Phase::Dirty;
                    self.set_status(SaveStatus::Idle);
                    debug!(
                        "Saved {} at revision {}, now at {}; still dirty",
                        date, revision, state.revision
                    );
                    if std::mem::take(&mut state.follow_up_due) {
                        drop(self.start_flush(&mut state));
                    }
                } else {
                    state.phase = Phase::Clean;
                    state.dirty_date = None;
                    self.set_status(SaveStatus::Saved);
                    debug!("Saved entry {} (revision {})", date, revision);
                }

                Ok(FlushOutcome::Saved {
                    entry,
                    revision,
                    stale,
                })
            }
            Err(e) => {
                let error = SessionError::Save {
                    date,
                    source: Arc::new(e),
                };
                warn!("{}", error);
                state.follow_up_due = false;
                state.last_error = Some(error.clone());
                state.phase = Phase::Failed {
                    error: error.clone(),
                };
                self.set_status(SaveStatus::Error(error.to_string()));
                Err(error)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::{sleep, Instant};

    const DEBOUNCE: Duration = Duration::from_secs(2);

    /// In-memory repository that records every write attempt
    struct FakeRepo {
        start: Instant,
        delay: Duration,
        fail: AtomicBool,
        attempts: Mutex<Vec<(EntryDate, String, Duration)>>,
        entries: Mutex<HashMap<EntryDate, Entry>>,
    }

    impl FakeRepo {
        fn new() -> Arc<Self> {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                delay,
                fail: AtomicBool::new(false),
                attempts: Mutex::new(Vec::new()),
                entries: Mutex::new(HashMap::new()),
            })
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn attempts(&self) -> Vec<(EntryDate, String, Duration)> {
            self.attempts.lock().unwrap().clone()
        }

        fn stored(&self, date: &EntryDate) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .get(date)
                .map(|e| e.content.clone())
        }

        fn seed(&self, date: &EntryDate, content: &str) {
            self.entries
                .lock()
                .unwrap()
                .insert(date.clone(), Entry::new(date.clone(), content));
        }
    }

    #[async_trait]
    impl EntryRepository for FakeRepo {
        async fn save_entry(&self, date: &EntryDate, content: &str) -> StorageResult<Entry> {
            self.attempts.lock().unwrap().push((
                date.clone(),
                content.to_string(),
                self.start.elapsed(),
            ));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk unplugged",
                )));
            }

            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .entry(date.clone())
                .or_insert_with(|| Entry::new(date.clone(), content));
            entry.content = content.to_string();
            Ok(entry.clone())
        }

        async fn load_entry(&self, date: &EntryDate) -> StorageResult<Option<Entry>> {
            Ok(self.entries.lock().unwrap().get(date).cloned())
        }
    }

    fn date(key: &str) -> EntryDate {
        EntryDate::parse(key).unwrap()
    }

    fn session(repo: &Arc<FakeRepo>, key: &str) -> EditSession {
        EditSession::new(repo.clone(), date(key), DEBOUNCE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_within_window_coalesce_into_one_flush() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        session.edit("a");
        sleep(Duration::from_millis(500)).await;
        session.edit("ab");
        sleep(Duration::from_millis(500)).await;
        session.edit("abc");

        sleep(Duration::from_secs(5)).await;

        let attempts = repo.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].1, "abc");
        // Last edit at 1.0s plus the 2s window
        assert!(attempts[0].2 >= Duration::from_millis(3000));
        assert!(attempts[0].2 < Duration::from_millis(3100));
        assert_eq!(session.status(), SaveStatus::Saved);
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_edit_resets_the_window() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        for n in 0..5 {
            session.edit(format!("draft {n}"));
            sleep(Duration::from_millis(1500)).await;
            assert!(repo.attempts().is_empty());
        }

        sleep(Duration::from_secs(1)).await;
        let attempts = repo.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].1, "draft 4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_now_during_flight_shares_one_write() {
        let repo = FakeRepo::with_delay(Duration::from_secs(1));
        let session = session(&repo, "2026-01-01");
        session.edit("text");

        let (first, second) = tokio::join!(session.flush_now(), session.flush_now());

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(repo.attempts().len(), 1);
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_on_clean_session_writes_nothing() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        assert_eq!(session.flush_now().await.unwrap(), FlushOutcome::Clean);
        assert!(repo.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_during_flight_get_exactly_one_follow_up() {
        let repo = FakeRepo::with_delay(Duration::from_secs(1));
        let session = session(&repo, "2026-01-01");
        session.edit("first");

        let background = session.clone();
        let in_flight = tokio::spawn(async move { background.flush_now().await });
        sleep(Duration::from_millis(100)).await;

        session.edit("second");
        session.edit("third");
        // Both join the running write and both ask for a follow-up
        let (joined, again) = tokio::join!(session.flush_now(), session.flush_now());
        assert!(matches!(joined, Ok(FlushOutcome::Saved { stale: true, revision: 1, .. })));
        assert_eq!(joined.as_ref().ok(), again.as_ref().ok());
        assert!(matches!(
            in_flight.await.unwrap(),
            Ok(FlushOutcome::Saved { stale: true, .. })
        ));

        // The follow-up is already running and covers the latest revision
        let follow_up = session.flush_now().await.unwrap();
        assert!(matches!(follow_up, FlushOutcome::Saved { stale: false, revision: 3, .. }));

        sleep(Duration::from_secs(10)).await;

        let attempts = repo.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].1, "third");
        // Follow-up starts as soon as the first write returns
        assert!(attempts[1].2 < Duration::from_millis(1100));
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_flush_leaves_session_dirty() {
        let repo = FakeRepo::with_delay(Duration::from_secs(1));
        let session = session(&repo, "2026-01-01");
        session.edit("before");

        let background = session.clone();
        let flush = tokio::spawn(async move { background.flush_now().await });
        sleep(Duration::from_millis(100)).await;
        session.edit("after");

        let outcome = flush.await.unwrap().unwrap();
        assert!(matches!(outcome, FlushOutcome::Saved { stale: true, revision: 1, .. }));
        assert!(session.is_dirty());
        assert_eq!(session.status(), SaveStatus::Idle);

        // The pending debounce picks up the rest
        sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.stored(&date("2026-01-01")).as_deref(), Some("after"));
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_not_retried_automatically() {
        let repo = FakeRepo::new();
        repo.set_failing(true);
        let session = session(&repo, "2026-01-01");
        session.edit("precious");

        let err = session.flush_now().await.unwrap_err();
        assert!(matches!(err, SessionError::Save { .. }));
        assert!(matches!(session.status(), SaveStatus::Error(_)));
        assert!(session.is_dirty());
        assert!(session.last_error().is_some());
        assert_eq!(session.content(), "precious");

        sleep(Duration::from_secs(30)).await;
        assert_eq!(repo.attempts().len(), 1);

        repo.set_failing(false);
        let saved = session.save().await.unwrap();
        assert_eq!(saved.unwrap().content, "precious");
        assert_eq!(repo.attempts().len(), 2);
        assert_eq!(session.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_after_failure_rearms_debounce() {
        let repo = FakeRepo::new();
        repo.set_failing(true);
        let session = session(&repo, "2026-01-01");
        session.edit("one");
        assert!(session.flush_now().await.is_err());

        repo.set_failing(false);
        session.edit("two");
        sleep(Duration::from_secs(3)).await;

        assert_eq!(repo.stored(&date("2026-01-01")).as_deref(), Some("two"));
        assert!(session.last_error().is_none());
        assert_eq!(session.status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stays_visible_until_a_save_lands() {
        let repo = FakeRepo::new();
        repo.set_failing(true);
        let session = session(&repo, "2026-01-01");
        session.edit("one");
        assert!(session.flush_now().await.is_err());

        session.edit("two");
        assert!(matches!(session.status(), SaveStatus::Error(_)));
        assert!(session.last_error().is_some());
        assert!(session.is_dirty());

        // The debounced retry fails as well; the indicator never went idle
        sleep(Duration::from_secs(3)).await;
        assert!(matches!(session.status(), SaveStatus::Error(_)));
        assert!(session.last_error().is_some());
        assert_eq!(repo.stored(&date("2026-01-01")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_date_flushes_outgoing_first() {
        let repo = FakeRepo::new();
        repo.seed(&date("2026-01-02"), "yesterday's words");
        let session = session(&repo, "2026-01-01");
        session.edit("today's words");

        session.switch_date(date("2026-01-02")).await.unwrap();

        assert_eq!(
            repo.stored(&date("2026-01-01")).as_deref(),
            Some("today's words")
        );
        assert_eq!(session.active_date(), date("2026-01-02"));
        assert_eq!(session.content(), "yesterday's words");
        assert!(!session.is_dirty());

        // The old date's timer must not write anything later
        sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_to_unsaved_date_starts_empty() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        session.switch_date(date("2026-03-03")).await.unwrap();

        assert_eq!(session.content(), EMPTY_CONTENT);
        assert!(session.entry().is_none());
        assert!(repo.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_aborts_when_flush_fails() {
        let repo = FakeRepo::new();
        repo.set_failing(true);
        let session = session(&repo, "2026-01-01");
        session.edit("unsaved");

        let err = session.switch_date(date("2026-01-02")).await.unwrap_err();

        assert!(matches!(err, SessionError::SwitchAborted { .. }));
        assert_eq!(session.active_date(), date("2026-01-01"));
        assert_eq!(session.content(), "unsaved");
        assert!(session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_dirty_rejects_inactive_date() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        let err = session.mark_dirty(&date("2026-01-02")).unwrap_err();
        assert!(matches!(err, SessionError::InactiveDate { .. }));
        assert!(!session.is_dirty());

        assert_eq!(session.mark_dirty(&date("2026-01-01")).unwrap(), 1);
        assert!(session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_revision_is_monotonic_across_switches() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        session.edit("a");
        session.edit("b");
        session.switch_date(date("2026-01-02")).await.unwrap();
        let next = session.edit("c");

        assert_eq!(next, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loads_saved_content() {
        let repo = FakeRepo::new();
        repo.seed(&date("2026-01-01"), "kept");

        let session = EditSession::open(repo.clone(), date("2026-01-01"), DEBOUNCE)
            .await
            .unwrap();

        assert_eq!(session.content(), "kept");
        assert!(session.entry().is_some());
        assert!(!session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_saved_persists_new_entry() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");

        let entry = session.ensure_saved().await.unwrap();

        assert_eq!(entry.entry_date, date("2026-01-01"));
        assert_eq!(repo.stored(&date("2026-01-01")).as_deref(), Some(EMPTY_CONTENT));

        // Already durable: no second write
        session.ensure_saved().await.unwrap();
        assert_eq!(repo.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_edits() {
        let repo = FakeRepo::new();
        let session = session(&repo, "2026-01-01");
        session.edit("last words");

        session.close().await.unwrap();

        assert_eq!(
            repo.stored(&date("2026-01-01")).as_deref(),
            Some("last words")
        );
        sleep(Duration::from_secs(5)).await;
        assert_eq!(repo.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_channel_reports_saves() {
        let repo = FakeRepo::with_delay(Duration::from_millis(200));
        let session = session(&repo, "2026-01-01");
        let mut status = session.subscribe_status();

        session.edit("x");
        let background = session.clone();
        let flush = tokio::spawn(async move { background.blur().await });

        status.changed().await.unwrap();
        assert_eq!(*status.borrow_and_update(), SaveStatus::Saving);

        flush.await.unwrap().unwrap();
        assert_eq!(*status.borrow(), SaveStatus::Saved);
    }
}
