//! Authentication context and hooks for the UI.

use std::sync::Arc;

use dioxus::prelude::*;
use store::config::TablesConfig;
use store::{AuthActions, Backend, LinkRepository, SessionState, SessionStore};

/// The backend and the collection names views should use.
///
/// Two handles are equal when they point at the same backend.
#[derive(Clone)]
pub struct BackendHandle {
    pub backend: Arc<dyn Backend>,
    pub tables: TablesConfig,
}

impl BackendHandle {
    pub fn new(backend: Arc<dyn Backend>, tables: TablesConfig) -> Self {
        Self { backend, tables }
    }

    pub fn auth(&self) -> AuthActions {
        AuthActions::new(self.backend.clone()).with_profiles_table(&self.tables.profiles)
    }

    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.backend.clone()).with_table(&self.tables.links)
    }
}

impl PartialEq for BackendHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend) && self.tables == other.tables
    }
}

/// Get the current session state.
/// Returns a signal that updates on every sign-in, sign-out, and token refresh.
pub fn use_auth() -> Signal<SessionState> {
    use_context::<Signal<SessionState>>()
}

/// The backend every view talks to.
pub fn use_backend() -> BackendHandle {
    use_context::<BackendHandle>()
}

/// Provider component that owns the session store.
/// Wrap your app with this component to enable [`use_auth`] and [`use_backend`].
#[component]
pub fn AuthProvider(backend: BackendHandle, children: Element) -> Element {
    let mut session = use_signal(SessionState::default);
    let handle = use_context_provider(|| backend);

    // Runs for as long as the provider is mounted. Unmounting drops the
    // store's auth subscription.
    use_future(move || {
        let backend = handle.backend.clone();
        async move {
            let mut store = SessionStore::new(backend);
            store
                .run(|state| {
                    if *session.peek() != *state {
                        session.set(state.clone());
                    }
                })
                .await;
        }
    });

    use_context_provider(|| session);

    rsx! {
        {children}
    }
}
