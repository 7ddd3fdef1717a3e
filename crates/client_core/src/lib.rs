use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::domain::{AuditResult, HistoryId, HistoryItem};
use storage::KeyValueStore;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod audit_service;
pub mod config;
pub mod error;
pub mod example_rotator;
pub mod history;
pub mod localization;

pub use audit_service::{AuditService, HttpAuditService, RetryPolicy};
pub use config::Settings;
pub use error::{PersistenceError, TransportError, ValidationError};
pub use example_rotator::ExampleRotator;
pub use history::{HistoryCache, HISTORY_CAPACITY, HISTORY_STORAGE_KEY};
pub use localization::{Language, Localization, StringTable};

use history::ClearConfirmation;

/// Client-side soft limit on submitted text, in characters.
pub const MAX_INPUT_CHARS: usize = 5_000;
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub fn validate_input(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    let chars = text.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(ValidationError::TooLong {
            chars,
            limit: MAX_INPUT_CHARS,
        });
    }
    Ok(())
}

/// Everything a controller needs from its composition root.
pub struct SessionContext {
    pub store: Arc<dyn KeyValueStore>,
    pub service: Arc<dyn AuditService>,
    pub settings: Settings,
    /// Language derived from the platform locale at startup.
    pub ambient_language: Language,
}

/// One-shot message for the user. Stored as a kind so it re-labels when the
/// language changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AuditFailed(AuditFailureKind),
    HistoryNotSaved,
    HistoryCleared,
}

impl Notice {
    pub fn text(&self, strings: &StringTable) -> String {
        match self {
            Self::AuditFailed(kind) => kind.text(strings),
            Self::HistoryNotSaved => strings.history_not_saved.to_string(),
            Self::HistoryCleared => strings.history_cleared.to_string(),
        }
    }
}

/// What went wrong with an audit, in terms the user can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFailureKind {
    Unreachable,
    TimedOut,
    /// The service refused the request (non-5xx status).
    Rejected { status: u16 },
    ServerError { status: u16 },
    BadResponse,
}

impl AuditFailureKind {
    pub fn from_error(err: &TransportError) -> Self {
        match err {
            TransportError::Network(_) => Self::Unreachable,
            TransportError::Timeout(_) => Self::TimedOut,
            TransportError::Status { status, .. } if *status >= 500 => {
                Self::ServerError { status: *status }
            }
            TransportError::Status { status, .. } => Self::Rejected { status: *status },
            TransportError::Decode(_) => Self::BadResponse,
        }
    }

    pub fn text(&self, strings: &StringTable) -> String {
        match self {
            Self::Unreachable => strings.audit_failed.to_string(),
            Self::TimedOut => strings.audit_timed_out.to_string(),
            Self::Rejected { status } => format!("{} (HTTP {status})", strings.audit_rejected),
            Self::ServerError { status } => {
                format!("{} (HTTP {status})", strings.audit_server_error)
            }
            Self::BadResponse => strings.audit_bad_response.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The service answered; the list may be empty.
    Completed(Vec<AuditResult>),
    Failed(TransportError),
    /// Input failed validation; nothing was sent.
    Rejected(ValidationError),
    /// Another audit was in flight; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SubmitStarted,
    SubmitSucceeded { count: usize },
    SubmitFailed,
    HistoryChanged { len: usize },
    HistoryReplayed { id: HistoryId },
    LanguageChanged { language: Language },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("an audit is in flight")]
    Busy,
    #[error("no history entry {0}")]
    NotFound(HistoryId),
}

/// Read-only view of everything the presentation layer displays.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub input: String,
    pub busy: bool,
    /// `None` until a session has run; an empty list means nothing was found.
    pub results: Option<Vec<AuditResult>>,
    pub notice: Option<Notice>,
    pub history: Vec<HistoryItem>,
    pub history_open: bool,
    pub clear_pending: bool,
    pub language: Language,
}

struct ControllerState {
    input: String,
    results: Option<Vec<AuditResult>>,
    notice: Option<Notice>,
    history: HistoryCache,
    history_open: bool,
    clear_pending: bool,
    localization: Localization,
    examples: ExampleRotator,
}

/// Clears the busy flag when the submission ends, including when its future
/// is dropped mid-flight.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one audit at a time against the audit service and keeps the
/// view state, history, language and example cursor for a session.
pub struct AuditSessionController {
    service: Arc<dyn AuditService>,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
    busy: AtomicBool,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuditSessionController {
    /// Loads the persisted history and returns an idle controller.
    pub async fn start(context: &SessionContext) -> Arc<Self> {
        let history = HistoryCache::load(Arc::clone(&context.store)).await;
        let language = context.settings.language.unwrap_or(context.ambient_language);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            history = history.len(),
            language = language.code(),
            "audit session started"
        );

        Arc::new(Self {
            service: Arc::clone(&context.service),
            retry_policy: context.settings.retry_policy,
            request_timeout: context.settings.request_timeout,
            busy: AtomicBool::new(false),
            inner: Mutex::new(ControllerState {
                input: String::new(),
                results: None,
                notice: None,
                history,
                history_open: false,
                clear_pending: false,
                localization: Localization::new(language),
                examples: ExampleRotator::builtin(context.settings.example_start),
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn input(&self) -> String {
        self.inner.lock().await.input.clone()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.inner.lock().await.input = text.into();
    }

    /// Whether the submit trigger should be enabled.
    pub async fn can_submit(&self) -> bool {
        !self.is_busy() && validate_input(&self.inner.lock().await.input).is_ok()
    }

    pub async fn results(&self) -> Option<Vec<AuditResult>> {
        self.inner.lock().await.results.clone()
    }

    /// Returns the pending notice and clears it.
    pub async fn take_notice(&self) -> Option<Notice> {
        self.inner.lock().await.notice.take()
    }

    /// Audits the current input.
    ///
    /// At most one audit runs per controller; a call made while another is
    /// in flight returns [`SubmitOutcome::Ignored`] without touching state.
    pub async fn submit(&self) -> SubmitOutcome {
        if self.is_busy() {
            debug!("submission ignored; audit already in flight");
            return SubmitOutcome::Ignored;
        }

        let text = self.inner.lock().await.input.clone();
        if let Err(err) = validate_input(&text) {
            debug!(error = %err, "submission rejected");
            return SubmitOutcome::Rejected(err);
        }

        let Some(busy) = BusyGuard::acquire(&self.busy) else {
            debug!("submission ignored; audit already in flight");
            return SubmitOutcome::Ignored;
        };

        {
            let mut state = self.inner.lock().await;
            state.results = None;
            state.notice = None;
        }
        self.emit(SessionEvent::SubmitStarted);
        info!(chars = text.chars().count(), "audit submitted");

        match self.call_service(&text).await {
            Ok(results) => {
                let mut state = self.inner.lock().await;
                state.results = Some(results.clone());
                let history_len = if results.is_empty() {
                    None
                } else {
                    let recorded = state
                        .history
                        .record(&text, &results)
                        .await
                        .map(|item| item.is_some());
                    if let Err(err) = recorded {
                        warn!(error = %err, "audit history not persisted");
                        state.notice = Some(Notice::HistoryNotSaved);
                    }
                    Some(state.history.len())
                };
                drop(state);
                drop(busy);

                info!(results = results.len(), "audit completed");
                if let Some(len) = history_len {
                    self.emit(SessionEvent::HistoryChanged { len });
                }
                self.emit(SessionEvent::SubmitSucceeded {
                    count: results.len(),
                });
                SubmitOutcome::Completed(results)
            }
            Err(err) => {
                warn!(error = %err, "audit failed");
                {
                    let mut state = self.inner.lock().await;
                    state.results = None;
                    state.notice = Some(Notice::AuditFailed(AuditFailureKind::from_error(&err)));
                }
                drop(busy);
                self.emit(SessionEvent::SubmitFailed);
                SubmitOutcome::Failed(err)
            }
        }
    }

    async fn call_service(&self, text: &str) -> Result<Vec<AuditResult>, TransportError> {
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.request_timeout, self.service.audit(text))
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(self.request_timeout)));

            let err = match result {
                Ok(results) => return Ok(results),
                Err(err) => err,
            };
            let Some(delay) = self.retry_policy.delay_after(attempt, &err) else {
                return Err(err);
            };
            warn!(attempt, error = %err, ?delay, "audit attempt failed; retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub async fn history(&self) -> Vec<HistoryItem> {
        self.inner.lock().await.history.items().to_vec()
    }

    pub async fn open_history(&self) {
        self.inner.lock().await.history_open = true;
    }

    /// Closing the view also drops an unconfirmed clear request.
    pub async fn close_history(&self) {
        let mut state = self.inner.lock().await;
        state.history_open = false;
        state.clear_pending = false;
    }

    pub async fn is_history_open(&self) -> bool {
        self.inner.lock().await.history_open
    }

    /// Replays a stored session into the current view without a network
    /// call. The history itself is left untouched.
    pub async fn select_history(&self, id: &HistoryId) -> Result<HistoryItem, ReplayError> {
        let mut state = self.inner.lock().await;
        if self.is_busy() {
            return Err(ReplayError::Busy);
        }
        let item = state
            .history
            .select(id)
            .cloned()
            .ok_or_else(|| ReplayError::NotFound(id.clone()))?;

        state.input = item.input_text.clone();
        state.results = Some(item.results.clone());
        state.notice = None;
        state.history_open = false;
        drop(state);

        debug!(id = %item.id, "history entry replayed");
        self.emit(SessionEvent::HistoryReplayed {
            id: item.id.clone(),
        });
        Ok(item)
    }

    /// Arms the clear confirmation. Returns false when there is nothing to
    /// clear.
    pub async fn request_clear_history(&self) -> bool {
        let mut state = self.inner.lock().await;
        state.clear_pending = !state.history.is_empty();
        state.clear_pending
    }

    pub async fn cancel_clear_history(&self) {
        self.inner.lock().await.clear_pending = false;
    }

    pub async fn is_clear_pending(&self) -> bool {
        self.inner.lock().await.clear_pending
    }

    /// Clears the history if a clear was requested. Returns whether it ran.
    pub async fn confirm_clear_history(&self) -> Result<bool, PersistenceError> {
        let mut state = self.inner.lock().await;
        if !state.clear_pending {
            return Ok(false);
        }
        state.clear_pending = false;
        if let Err(err) = state.history.clear(ClearConfirmation::confirmed()).await {
            warn!(error = %err, items = state.history.len(), "audit history not cleared");
            return Err(err);
        }
        state.notice = Some(Notice::HistoryCleared);
        drop(state);

        info!("audit history cleared");
        self.emit(SessionEvent::HistoryChanged { len: 0 });
        Ok(true)
    }

    pub async fn language(&self) -> Language {
        self.inner.lock().await.localization.language()
    }

    pub async fn strings(&self) -> &'static StringTable {
        self.inner.lock().await.localization.strings()
    }

    pub async fn toggle_language(&self) -> Language {
        let language = self.inner.lock().await.localization.toggle();
        debug!(language = language.code(), "language toggled");
        self.emit(SessionEvent::LanguageChanged { language });
        language
    }

    /// Puts the next sample text into the input and returns it.
    pub async fn load_next_example(&self) -> String {
        let mut state = self.inner.lock().await;
        let example = state.examples.next_example().to_string();
        state.input = example.clone();
        example
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.lock().await;
        SessionSnapshot {
            input: state.input.clone(),
            busy: self.is_busy(),
            results: state.results.clone(),
            notice: state.notice.clone(),
            history: state.history.items().to_vec(),
            history_open: state.history_open,
            clear_pending: state.clear_pending,
            language: state.localization.language(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
