//! Fan-out of auth-state notifications to any number of listeners.
//!
//! Each listener gets its own unbounded channel, so notifications reach it in
//! emission order and are never coalesced. Dropping an [`AuthSubscription`]
//! deregisters its listener.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;

use crate::backend::{AuthChangeEvent, AuthEvent, AuthSubscription, Unsubscribe};
use crate::models::Session;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    senders: Vec<(u64, mpsc::UnboundedSender<AuthEvent>)>,
}

/// Registry of auth-state listeners shared by a backend and its subscriptions.
#[derive(Clone, Default)]
pub struct AuthEventHub {
    listeners: Arc<Mutex<Listeners>>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AuthEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It receives every event emitted after this call.
    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut listeners = lock(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.senders.push((id, tx));
            id
        };

        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        AuthSubscription::new(
            rx,
            Unsubscribe::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    lock(&listeners).senders.retain(|(other, _)| *other != id);
                    tracing::debug!(listener = id, "Auth listener removed");
                }
            }),
        )
    }

    /// Deliver `session` to every live listener.
    pub fn emit(&self, kind: AuthChangeEvent, session: Option<Arc<Session>>) {
        let mut listeners = lock(&self.listeners);
        tracing::debug!(
            ?kind,
            listeners = listeners.senders.len(),
            "Auth state changed"
        );
        listeners.senders.retain(|(_, tx)| {
            tx.send(AuthEvent {
                kind,
                session: session.clone(),
            })
            .is_ok()
        });
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).senders.len()
    }
}
