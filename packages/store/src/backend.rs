//! # Backend collaborator contract
//!
//! The hosted backend provides three surfaces, each expressed as an object-safe
//! async trait so the UI can hold a single `Arc<dyn Backend>`:
//!
//! | Trait | Operations |
//! |-------|-----------|
//! | [`AuthBackend`] | `get_session`, `on_auth_state_change`, `sign_in_with_password`, `sign_up`, `sign_out` |
//! | [`TableBackend`] | `select`, `insert` |
//! | [`RealtimeBackend`] | `subscribe` (unsubscribe by dropping the returned [`ChangeSubscription`]) |
//!
//! Implementations: `api::BackendClient` talks to the real service,
//! [`crate::MemoryBackend`] keeps everything in process.
//!
//! ## Subscriptions
//!
//! Both subscription kinds hold an [`Unsubscribe`] guard. The guard runs its
//! release hook exactly once, either through an explicit `unsubscribe()` call or
//! on drop, so tearing down the owning screen is enough to release it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::models::Session;

/// Invoked once per change notification. Carries no payload.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Why the auth state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// An auth-state notification carrying the full replacement session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthChangeEvent,
    pub session: Option<Arc<Session>>,
}

/// Runs a release hook exactly once.
#[derive(Default)]
pub struct Unsubscribe {
    hook: std::sync::Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscribe {
    pub fn new(hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            hook: std::sync::Mutex::new(Some(Box::new(hook))),
        }
    }

    /// Guard with nothing to release.
    pub fn noop() -> Self {
        Self::default()
    }

    fn release(&mut self) {
        let hook = self
            .hook
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field(
                "active",
                &self
                    .hook
                    .lock()
                    .map(|hook| hook.is_some())
                    .unwrap_or_else(|poisoned| poisoned.into_inner().is_some()),
            )
            .finish()
    }
}

/// Ordered stream of auth-state notifications for one listener.
#[derive(Debug)]
pub struct AuthSubscription {
    events: mpsc::UnboundedReceiver<AuthEvent>,
    guard: Unsubscribe,
}

impl AuthSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<AuthEvent>, guard: Unsubscribe) -> Self {
        Self { events, guard }
    }

    /// Next notification, or `None` once the source is gone.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<AuthEvent> {
        self.events.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.guard.release();
    }
}

/// Handle to an open change-feed subscription.
#[derive(Debug)]
pub struct ChangeSubscription {
    guard: Unsubscribe,
}

impl ChangeSubscription {
    pub fn new(guard: Unsubscribe) -> Self {
        Self { guard }
    }

    pub fn unsubscribe(mut self) {
        self.guard.release();
    }
}

/// Sort direction for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A read of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    /// Empty means every column.
    pub columns: Vec<String>,
    pub order: Option<OrderBy>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            order: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    /// Comma-joined column list, `*` when none were named.
    pub fn column_list(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }
}

/// Row events a change subscription listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeEvent {
    #[default]
    All,
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "*",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn matches(&self, other: ChangeEvent) -> bool {
        *self == ChangeEvent::All || *self == other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: ChangeEvent,
    pub schema: String,
}

impl Default for ChangeFilter {
    fn default() -> Self {
        Self {
            event: ChangeEvent::All,
            schema: "public".to_string(),
        }
    }
}

/// Response to a successful sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignUpResponse {
    /// The new account's id, when the backend returned one.
    pub user_id: Option<String>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The session the backend currently holds, if any.
    async fn get_session(&self) -> Result<Option<Arc<Session>>, BackendError>;

    /// Listen for auth-state changes until the subscription is dropped.
    fn on_auth_state_change(&self) -> AuthSubscription;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<(), BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}

#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Rows visible to the current session, as raw JSON objects.
    async fn select(&self, query: SelectQuery) -> Result<Vec<serde_json::Value>, BackendError>;

    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<(), BackendError>;
}

#[async_trait]
pub trait RealtimeBackend: Send + Sync {
    /// Call `on_change` for every matching row event on `table` until the
    /// returned subscription is released.
    async fn subscribe(
        &self,
        table: &str,
        filter: ChangeFilter,
        on_change: ChangeCallback,
    ) -> Result<ChangeSubscription, BackendError>;
}

/// The full backend surface.
pub trait Backend: AuthBackend + TableBackend + RealtimeBackend {}

impl<T: AuthBackend + TableBackend + RealtimeBackend> Backend for T {}
