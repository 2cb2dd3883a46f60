//! Sign-in, sign-up, and sign-out.
//!
//! None of these touch the [`SessionStore`](crate::SessionStore) directly: the
//! backend emits an auth-state notification and the store picks it up.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::TablesConfig;
use crate::error::{AuthError, BackendError};
use crate::forms::CredentialsForm;
use crate::models::Profile;

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    /// Id of the new account, when the backend returned one.
    pub user_id: Option<String>,
    /// The profile row could not be written. The account exists regardless.
    pub profile_error: Option<BackendError>,
}

#[derive(Clone)]
pub struct AuthActions {
    backend: Arc<dyn Backend>,
    profiles_table: String,
}

impl AuthActions {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            profiles_table: TablesConfig::default().profiles,
        }
    }

    /// Write profiles to `table` instead of the default.
    pub fn with_profiles_table(mut self, table: impl Into<String>) -> Self {
        self.profiles_table = table.into();
        self
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let (email, password) = CredentialsForm::new(email, password).validate()?;
        self.backend
            .sign_in_with_password(&email, &password)
            .await
            .map_err(|err| {
                tracing::debug!("Sign-in rejected: {err}");
                AuthError::from(err)
            })
    }

    /// Create the account, then mirror it into the profiles collection.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let (email, password) = CredentialsForm::new(email, password).validate()?;
        let response = self.backend.sign_up(&email, &password).await?;

        let mut profile_error = None;
        if let Some(id) = &response.user_id {
            let profile = Profile {
                id: id.clone(),
                email: email.clone(),
            };
            let record = serde_json::to_value(&profile)
                .map_err(|err| BackendError::Decode(err.to_string()));
            let inserted = match record {
                Ok(record) => self.backend.insert(&self.profiles_table, record).await,
                Err(err) => Err(err),
            };
            if let Err(err) = inserted {
                tracing::warn!(user = %id, "Failed to create profile: {err}");
                profile_error = Some(err);
            }
        }

        Ok(SignUpOutcome {
            user_id: response.user_id,
            profile_error,
        })
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await.map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::memory::{Fault, MemoryBackend};
    use crate::AuthBackend;

    fn actions(backend: &MemoryBackend) -> AuthActions {
        AuthActions::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_sign_up_inserts_profile() {
        let backend = MemoryBackend::new().with_email_confirmation();
        let outcome = actions(&backend)
            .sign_up("a@x.com", "secret1")
            .await
            .unwrap();

        let user_id = outcome.user_id.unwrap();
        assert!(outcome.profile_error.is_none());
        let profiles = backend.rows("profiles");
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["id"], user_id.as_str());
        assert_eq!(profiles[0]["email"], "a@x.com");
        assert_eq!(backend.request_count("insert:profiles"), 1);
    }

    #[tokio::test]
    async fn test_profile_failure_is_not_fatal() {
        let backend = MemoryBackend::new();
        backend.inject_error(
            Fault::Insert("profiles".into()),
            BackendError::api(409, "duplicate key value violates unique constraint"),
        );

        let outcome = actions(&backend)
            .sign_up("a@x.com", "secret1")
            .await
            .unwrap();
        assert!(outcome.user_id.is_some());
        assert_eq!(
            outcome.profile_error.unwrap().message(),
            "duplicate key value violates unique constraint"
        );
        assert!(backend.get_session().await.unwrap().is_some());
        assert!(backend.rows("profiles").is_empty());
    }

    #[tokio::test]
    async fn test_rejection_carries_backend_message() {
        let backend = MemoryBackend::new();
        let err = actions(&backend)
            .sign_in("nobody@x.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Rejected("Invalid login credentials".into()));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_failed_sign_up_writes_no_profile() {
        let backend = MemoryBackend::new();
        let auth = actions(&backend);
        auth.sign_up("a@x.com", "secret1").await.unwrap();

        let err = auth.sign_up("a@x.com", "secret1").await.unwrap_err();
        assert_eq!(err, AuthError::Rejected("User already registered".into()));
        assert_eq!(backend.request_count("insert:profiles"), 1);
    }

    #[tokio::test]
    async fn test_blank_credentials_send_nothing() {
        let backend = MemoryBackend::new();
        let auth = actions(&backend);

        let err = auth.sign_in("", "secret1").await.unwrap_err();
        assert_eq!(err, AuthError::Invalid(ValidationError::MissingEmail));
        let err = auth.sign_up("a@x.com", "").await.unwrap_err();
        assert_eq!(err, AuthError::Invalid(ValidationError::MissingPassword));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let backend = MemoryBackend::new();
        let auth = actions(&backend);
        auth.sign_up("a@x.com", "secret1").await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(backend.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_profiles_table() {
        let backend = MemoryBackend::new();
        actions(&backend)
            .with_profiles_table("members")
            .sign_up("a@x.com", "secret1")
            .await
            .unwrap();
        assert_eq!(backend.rows("members").len(), 1);
        assert!(backend.rows("profiles").is_empty());
    }
}
