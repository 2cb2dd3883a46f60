//! # In-memory backend
//!
//! [`MemoryBackend`] implements the whole [`Backend`](crate::Backend) surface in
//! process. It is what the test suites run against and what the mobile app uses
//! when built with the `offline` feature.
//!
//! It mimics the parts of the hosted service this client depends on:
//!
//! - **Auth**: accounts keyed by email, one current session, notifications
//!   through an [`AuthEventHub`]. Sign-up signs the user straight in unless
//!   [`with_email_confirmation`](MemoryBackend::with_email_confirmation) is set.
//! - **Storage**: rows get a backend-assigned `id` and a strictly increasing
//!   `created_at`. Each row belongs to the user who inserted it and is only
//!   returned to that user, like a row-level policy on `user_id`.
//! - **Realtime**: every insert fires every matching watcher of that table,
//!   whoever made the change. [`notify_change`](MemoryBackend::notify_change)
//!   simulates changes made elsewhere.
//! - **Faults**: [`inject_error`](MemoryBackend::inject_error) makes the next
//!   call of one operation fail with a chosen error.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::backend::{
    AuthBackend, AuthChangeEvent, AuthSubscription, ChangeCallback, ChangeEvent, ChangeFilter,
    ChangeSubscription, RealtimeBackend, SelectQuery, SignUpResponse, TableBackend, Unsubscribe,
};
use crate::error::BackendError;
use crate::events::AuthEventHub;
use crate::models::{Session, UserInfo};

const MIN_PASSWORD_LEN: usize = 6;

/// An operation whose next call can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    GetSession,
    SignIn,
    SignUp,
    SignOut,
    Select(String),
    Insert(String),
    Subscribe(String),
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Clone)]
struct StoredRow {
    owner: Option<String>,
    value: Value,
}

struct Watcher {
    id: u64,
    table: String,
    filter: ChangeFilter,
    on_change: ChangeCallback,
}

#[derive(Default)]
struct State {
    require_confirmation: bool,
    accounts: Vec<Account>,
    session: Option<Arc<Session>>,
    tables: HashMap<String, Vec<StoredRow>>,
    last_created: Option<DateTime<Utc>>,
    watchers: Vec<Watcher>,
    next_watcher: u64,
    faults: HashMap<Fault, BackendError>,
    requests: Vec<String>,
}

/// In-memory [`Backend`](crate::Backend) for tests and offline runs.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    events: AuthEventHub,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// New accounts must be confirmed before they can sign in, and sign-up
    /// does not create a session.
    pub fn with_email_confirmation(self) -> Self {
        lock(&self.state).require_confirmation = true;
        self
    }

    /// Mark an account as confirmed.
    pub fn confirm_email(&self, email: &str) {
        let mut state = lock(&self.state);
        if let Some(account) = state
            .accounts
            .iter_mut()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        {
            account.confirmed = true;
        }
    }

    /// Fail the next call of `fault` with `error`.
    pub fn inject_error(&self, fault: Fault, error: BackendError) {
        lock(&self.state).faults.insert(fault, error);
    }

    /// Every request received so far, e.g. `"select:links"`.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// Number of requests whose label equals `label`.
    pub fn request_count(&self, label: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.as_str() == label)
            .count()
    }

    /// All rows of `table` regardless of owner.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.state)
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|r| r.value.clone()).collect())
            .unwrap_or_default()
    }

    /// Open change subscriptions on `table`.
    pub fn subscriber_count(&self, table: &str) -> usize {
        lock(&self.state)
            .watchers
            .iter()
            .filter(|w| w.table == table)
            .count()
    }

    pub fn auth_listener_count(&self) -> usize {
        self.events.listener_count()
    }

    /// Signal a change on `table` as if another client made it.
    pub fn notify_change(&self, table: &str, event: ChangeEvent) {
        let callbacks: Vec<ChangeCallback> = lock(&self.state)
            .watchers
            .iter()
            .filter(|w| w.table == table && w.filter.event.matches(event))
            .map(|w| w.on_change.clone())
            .collect();
        tracing::debug!(table, ?event, watchers = callbacks.len(), "Change notification");
        for on_change in callbacks {
            on_change();
        }
    }

    /// Record the request and consume a pending fault for it, if any.
    fn begin(&self, label: String, fault: Fault) -> Result<MutexGuard<'_, State>, BackendError> {
        let mut state = lock(&self.state);
        state.requests.push(label);
        match state.faults.remove(&fault) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    fn open_session(account: &Account) -> Arc<Session> {
        Arc::new(Session {
            user: UserInfo {
                id: account.id.clone(),
                email: Some(account.email.clone()),
            },
            access_token: uuid::Uuid::new_v4().to_string(),
            refresh_token: Some(uuid::Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        })
    }
}

/// Strictly increasing creation time, even for inserts within one clock tick.
fn next_created_at(state: &mut State) -> DateTime<Utc> {
    let now = Utc::now();
    let created = match state.last_created {
        Some(last) if last >= now => last + chrono::Duration::microseconds(1),
        _ => now,
    };
    state.last_created = Some(created);
    created
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), Some(v)) if !v.is_null() => Ordering::Less,
        (Some(v), None | Some(Value::Null)) if !v.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(value: &Value, columns: &[String]) -> Value {
    match value {
        Value::Object(map) if !columns.is_empty() => Value::Object(
            map.iter()
                .filter(|(key, _)| columns.iter().any(|c| c == *key))
                .map(|(key, v)| (key.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Arc<Session>>, BackendError> {
        let state = self.begin("get_session".into(), Fault::GetSession)?;
        Ok(state.session.clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let session = {
            let mut state = self.begin("sign_in".into(), Fault::SignIn)?;
            let account = state
                .accounts
                .iter()
                .find(|a| a.email.eq_ignore_ascii_case(email) && a.password == password)
                .cloned()
                .ok_or_else(|| BackendError::api(400, "Invalid login credentials"))?;
            if state.require_confirmation && !account.confirmed {
                return Err(BackendError::api(400, "Email not confirmed"));
            }
            let session = Self::open_session(&account);
            state.session = Some(session.clone());
            session
        };
        self.events.emit(AuthChangeEvent::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, BackendError> {
        let (user_id, session) = {
            let mut state = self.begin("sign_up".into(), Fault::SignUp)?;
            if password.len() < MIN_PASSWORD_LEN {
                return Err(BackendError::api(
                    422,
                    format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
                ));
            }
            if state
                .accounts
                .iter()
                .any(|a| a.email.eq_ignore_ascii_case(email))
            {
                return Err(BackendError::api(422, "User already registered"));
            }
            let account = Account {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.to_string(),
                password: password.to_string(),
                confirmed: !state.require_confirmation,
            };
            let session = account.confirmed.then(|| Self::open_session(&account));
            if let Some(session) = &session {
                state.session = Some(session.clone());
            }
            let id = account.id.clone();
            state.accounts.push(account);
            (id, session)
        };
        if let Some(session) = session {
            self.events.emit(AuthChangeEvent::SignedIn, Some(session));
        }
        Ok(SignUpResponse {
            user_id: Some(user_id),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        {
            let mut state = self.begin("sign_out".into(), Fault::SignOut)?;
            state.session = None;
        }
        self.events.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Value>, BackendError> {
        let state = self.begin(
            format!("select:{}", query.table),
            Fault::Select(query.table.clone()),
        )?;
        let owner = state.session.as_ref().map(|s| s.user.id.clone());
        let mut rows: Vec<&Value> = state
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.owner == owner)
                    .map(|row| &row.value)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| project(row, &query.columns))
            .collect())
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), BackendError> {
        {
            let mut state = self.begin(format!("insert:{table}"), Fault::Insert(table.to_string()))?;
            let Value::Object(mut map) = record else {
                return Err(BackendError::api(400, "Record must be a JSON object"));
            };
            let owner = state.session.as_ref().map(|s| s.user.id.clone());
            let created = next_created_at(&mut state);

            map.entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
            map.entry("created_at").or_insert_with(|| {
                Value::String(created.to_rfc3339_opts(SecondsFormat::Micros, true))
            });
            if let Some(owner) = &owner {
                map.entry("user_id")
                    .or_insert_with(|| Value::String(owner.clone()));
            }

            state
                .tables
                .entry(table.to_string())
                .or_default()
                .push(StoredRow {
                    owner,
                    value: Value::Object(map),
                });
        }
        self.notify_change(table, ChangeEvent::Insert);
        Ok(())
    }
}

#[async_trait]
impl RealtimeBackend for MemoryBackend {
    async fn subscribe(
        &self,
        table: &str,
        filter: ChangeFilter,
        on_change: ChangeCallback,
    ) -> Result<ChangeSubscription, BackendError> {
        let id = {
            let mut state =
                self.begin(format!("subscribe:{table}"), Fault::Subscribe(table.to_string()))?;
            let id = state.next_watcher;
            state.next_watcher += 1;
            state.watchers.push(Watcher {
                id,
                table: table.to_string(),
                filter,
                on_change,
            });
            id
        };

        let weak: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        Ok(ChangeSubscription::new(Unsubscribe::new(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).watchers.retain(|w| w.id != id);
            }
        })))
    }
}
