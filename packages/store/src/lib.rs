pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod forms;
pub mod links;
pub mod models;
pub mod nav;
pub mod session;

mod memory;
pub use memory::{Fault, MemoryBackend};

pub use auth::{AuthActions, SignUpOutcome};
pub use backend::{
    AuthBackend, AuthChangeEvent, AuthEvent, AuthSubscription, Backend, ChangeCallback,
    ChangeEvent, ChangeFilter, ChangeSubscription, RealtimeBackend, SelectQuery, SignUpResponse,
    TableBackend, Unsubscribe,
};
pub use config::AppConfig;
pub use error::{AuthError, BackendError, ConfigError, ValidationError};
pub use events::AuthEventHub;
pub use forms::{CredentialsForm, LinkForm};
pub use links::{ChangeWatch, LinkList, LinkRepository};
pub use models::{Link, NewLink, Profile, Session, UserInfo};
pub use nav::{NavGraph, Screen};
pub use session::{SessionState, SessionStore};
