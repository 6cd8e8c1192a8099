//! Debounced auto-save of a page draft.
//!
//! One [`AutoSaveController`] exists per editing session. Draft changes are
//! merged in memory and flushed to the injected [`PageSaver`] after a quiet
//! period. Every save attempt carries a request id; a response whose id is no
//! longer the latest is dropped, so the last issued save always wins.
//!
//! Status changes are published on a `watch` channel for the UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::CoreError;
use crate::page::{PageSnapshot, PageSnapshotPatch, SavePageRequest};
use crate::types::DbId;

/// Default quiet period before a dirty draft is saved.
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;

/// Message shown when a failure carries no message of its own.
pub const GENERIC_SAVE_ERROR_MESSAGE: &str = "Failed to save changes. Please try again.";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoSaveStatus {
    Idle,
    Dirty,
    Saving,
    Synced,
    Error,
}

/// Observable state of an [`AutoSaveController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoSaveState {
    pub status: AutoSaveStatus,
    pub message: Option<String>,
}

impl AutoSaveState {
    fn new(status: AutoSaveStatus, message: Option<String>) -> Self {
        Self { status, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    pub debounce: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

// ---------------------------------------------------------------------------
// Save collaborator
// ---------------------------------------------------------------------------

/// Failure reported by a [`PageSaver`]. Always carries a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SaveError {
    message: String,
}

impl SaveError {
    /// Blank messages are replaced with [`GENERIC_SAVE_ERROR_MESSAGE`].
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self {
                message: GENERIC_SAVE_ERROR_MESSAGE.to_string(),
            }
        } else {
            Self { message }
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CoreError> for SaveError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) | CoreError::Conflict(msg) => Self::new(msg),
            _ => Self::new(GENERIC_SAVE_ERROR_MESSAGE),
        }
    }
}

/// Persists a page snapshot.
#[async_trait]
pub trait PageSaver: Send + Sync {
    async fn save(&self, request: SavePageRequest) -> Result<(), SaveError>;
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the draft, the last synced snapshot and the debounce timer of one
/// page. Dropping the controller cancels the timer and discards responses of
/// saves still in flight.
pub struct AutoSaveController {
    shared: Arc<Shared>,
}

struct Shared {
    page_id: DbId,
    saver: Arc<dyn PageSaver>,
    debounce: Duration,
    inner: Mutex<Inner>,
    status: watch::Sender<AutoSaveState>,
    closed: AtomicBool,
}

struct Inner {
    draft: PageSnapshot,
    last_synced: PageSnapshot,
    enabled: bool,
    /// Id of the latest save attempt.
    request_id: u64,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is cancelled or replaced.
    timer_id: u64,
}

impl Inner {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.timer_id += 1;
    }

    /// Forget the current draft and ignore every in-flight response.
    fn discard(&mut self, snapshot: PageSnapshot) {
        self.cancel_timer();
        self.request_id += 1;
        self.draft = snapshot.clone();
        self.last_synced = snapshot;
    }
}

impl AutoSaveController {
    pub fn new(
        page_id: DbId,
        initial: PageSnapshot,
        saver: Arc<dyn PageSaver>,
        config: AutoSaveConfig,
    ) -> Self {
        let (status, _) = watch::channel(AutoSaveState::new(AutoSaveStatus::Idle, None));
        Self {
            shared: Arc::new(Shared {
                page_id,
                saver,
                debounce: config.debounce,
                inner: Mutex::new(Inner {
                    draft: initial.clone(),
                    last_synced: initial,
                    enabled: true,
                    request_id: 0,
                    timer: None,
                    timer_id: 0,
                }),
                status,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn page_id(&self) -> DbId {
        self.shared.page_id
    }

    /// Current status.
    pub fn state(&self) -> AutoSaveState {
        self.shared.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<AutoSaveState> {
        self.shared.status.subscribe()
    }

    /// Copy of the in-memory draft.
    pub async fn draft(&self) -> PageSnapshot {
        self.shared.inner.lock().await.draft.clone()
    }

    /// Merge `patch` into the draft.
    ///
    /// A draft equal to the last synced snapshot cancels any pending save and
    /// reports idle. Anything else reports dirty and restarts the debounce.
    pub async fn update_draft(&self, patch: PageSnapshotPatch) {
        let mut inner = self.shared.inner.lock().await;
        if !inner.enabled {
            return;
        }
        inner.draft = inner.draft.merged(patch);
        if inner.draft == inner.last_synced {
            inner.cancel_timer();
            self.shared.publish(AutoSaveStatus::Idle, None);
        } else {
            self.shared.publish(AutoSaveStatus::Dirty, None);
            Shared::schedule(&self.shared, &mut inner);
        }
    }

    /// Report dirty and restart the debounce without touching the draft.
    pub async fn mark_dirty(&self) {
        let mut inner = self.shared.inner.lock().await;
        if !inner.enabled {
            return;
        }
        self.shared.publish(AutoSaveStatus::Dirty, None);
        Shared::schedule(&self.shared, &mut inner);
    }

    /// Report an error raised outside the save path (e.g. a failed upload).
    pub fn mark_error(&self) {
        self.shared.publish(
            AutoSaveStatus::Error,
            Some(GENERIC_SAVE_ERROR_MESSAGE.to_string()),
        );
    }

    /// Save now instead of waiting for the debounce. Does nothing when there
    /// is nothing pending.
    pub async fn flush_now(&self) {
        let pending = {
            let mut inner = self.shared.inner.lock().await;
            if !inner.enabled {
                return;
            }
            let pending = inner.timer.is_some() || inner.draft != inner.last_synced;
            inner.cancel_timer();
            pending
        };
        if pending {
            Arc::clone(&self.shared).save().await;
        }
    }

    /// Start over from `initial`. Pending and in-flight saves are discarded.
    pub async fn reset(&self, initial: PageSnapshot, enabled: bool) {
        let mut inner = self.shared.inner.lock().await;
        inner.discard(initial);
        inner.enabled = enabled;
        self.shared.publish(AutoSaveStatus::Idle, None);
    }

    /// Turn saving on or off. Any change drops uncommitted draft content.
    pub async fn set_enabled(&self, enabled: bool) {
        let mut inner = self.shared.inner.lock().await;
        if inner.enabled == enabled {
            return;
        }
        let synced = inner.last_synced.clone();
        inner.discard(synced);
        inner.enabled = enabled;
        self.shared.publish(AutoSaveStatus::Idle, None);
    }
}

impl Drop for AutoSaveController {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            inner.cancel_timer();
            inner.request_id += 1;
        }
    }
}

impl Shared {
    fn publish(&self, status: AutoSaveStatus, message: Option<String>) {
        self.status.send_replace(AutoSaveState::new(status, message));
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// (Re)start the debounce timer. The save runs in its own task so
    /// cancelling the timer never interrupts a save in flight.
    fn schedule(this: &Arc<Self>, inner: &mut Inner) {
        inner.cancel_timer();
        let timer_id = inner.timer_id;
        let shared = Arc::clone(this);
        let debounce = this.debounce;
        tracing::debug!(page_id = this.page_id, ?debounce, "Scheduling page save");
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            tokio::spawn(shared.fire(timer_id));
        }));
    }

    async fn fire(self: Arc<Self>, timer_id: u64) {
        {
            let mut inner = self.inner.lock().await;
            if inner.timer_id != timer_id {
                return;
            }
            inner.timer = None;
        }
        self.save().await;
    }

    async fn save(self: Arc<Self>) {
        if self.is_closed() {
            return;
        }
        let (request_id, request) = {
            let mut inner = self.inner.lock().await;
            if !inner.enabled {
                return;
            }
            inner.request_id += 1;
            self.publish(AutoSaveStatus::Saving, None);
            let request = SavePageRequest {
                page_id: self.page_id,
                snapshot: inner.draft.clone(),
            };
            (inner.request_id, request)
        };

        tracing::debug!(page_id = self.page_id, request_id, "Saving page draft");
        let result = self.saver.save(request.clone()).await;

        let mut inner = self.inner.lock().await;
        if self.is_closed() || inner.request_id != request_id {
            tracing::debug!(
                page_id = self.page_id,
                request_id,
                latest = inner.request_id,
                "Dropping stale save response"
            );
            return;
        }
        match result {
            Ok(()) => {
                inner.last_synced = request.snapshot;
                if inner.draft == inner.last_synced {
                    self.publish(AutoSaveStatus::Synced, None);
                } else {
                    self.publish(AutoSaveStatus::Dirty, None);
                    if inner.timer.is_none() {
                        Self::schedule(&self, &mut inner);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(page_id = self.page_id, request_id, error = %err, "Page save failed");
                self.publish(AutoSaveStatus::Error, Some(err.message().to_string()));
            }
        }
    }
}
