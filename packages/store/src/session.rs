//! # Session Store
//!
//! Owns the current [`Session`] and republishes it whenever the backend reports
//! an auth-state change. Every other component only ever sees immutable
//! snapshots through the `publish` callback passed to [`SessionStore::run`] or
//! through the read accessors.
//!
//! ## Lifecycle
//!
//! 1. Construction leaves the store in [`SessionState::Loading`].
//! 2. [`run`](SessionStore::run) subscribes to the backend's auth feed, fetches
//!    the current session, and publishes [`SessionState::Ready`]. A failed fetch
//!    counts as "signed out" and is only logged.
//! 3. Each notification replaces the session wholesale and is published in the
//!    order the backend delivered it.
//! 4. Dropping the `run` future (the owning provider is torn down) drops the
//!    subscription, which releases it exactly once.

use std::sync::Arc;

use crate::auth::AuthActions;
use crate::backend::Backend;
use crate::models::{Session, UserInfo};

/// What the rest of the app knows about authentication.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// The first session fetch has not resolved yet.
    #[default]
    Loading,
    /// Resolved. `None` means signed out.
    Ready(Option<Arc<Session>>),
}

impl SessionState {
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Ready(session) => session.as_ref(),
            Self::Loading => None,
        }
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.session().map(|s| &s.user)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Single writer of the session.
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    state: SessionState,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: SessionState::Loading,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.state.session()
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.state.user()
    }

    /// Sign-in, sign-up, and sign-out against the same backend.
    pub fn actions(&self) -> AuthActions {
        AuthActions::new(self.backend.clone())
    }

    /// Track the session until the backend's auth feed closes.
    ///
    /// `publish` is called once with the initial session and then once per
    /// notification. Cancel by dropping the returned future.
    pub async fn run<F>(&mut self, mut publish: F)
    where
        F: FnMut(&SessionState),
    {
        let mut events = self.backend.on_auth_state_change();

        let initial = match self.backend.get_session().await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!("Failed to fetch current session: {err}");
                None
            }
        };
        self.replace(initial, &mut publish);

        while let Some(event) = events.next().await {
            tracing::debug!(
                kind = ?event.kind,
                signed_in = event.session.is_some(),
                "Session updated"
            );
            self.replace(event.session, &mut publish);
        }
        tracing::debug!("Auth feed closed");
    }

    fn replace<F>(&mut self, session: Option<Arc<Session>>, publish: &mut F)
    where
        F: FnMut(&SessionState),
    {
        self.state = SessionState::Ready(session);
        publish(&self.state);
    }
}
