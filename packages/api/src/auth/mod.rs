//! Email/password authentication against the hosted auth service.
//!
//! The client holds the one in-memory session. Every change to it goes through
//! [`BackendClient::set_session`], which also notifies auth listeners, so
//! sign-in and sign-up never hand the session to their caller directly.

mod session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use store::{
    AuthBackend, AuthChangeEvent, AuthSubscription, BackendError, Session, SignUpResponse,
};

use crate::client::BackendClient;
use crate::error::decode;
use session::{PasswordCredentials, RefreshGrant, SignUpBody, TokenResponse};

/// Refresh tokens this close to expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

impl BackendClient {
    async fn grant(&self, grant_type: &str, body: &impl serde::Serialize) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self
            .send(self.request(Method::POST, url).json(body))
            .await?;
        let token: TokenResponse = response.json().await.map_err(decode)?;
        Ok(token.into_session(Utc::now()))
    }

    async fn refresh(&self, current: &Session) -> Option<Arc<Session>> {
        let refresh_token = current.refresh_token.as_deref()?;
        match self
            .grant("refresh_token", &RefreshGrant { refresh_token })
            .await
        {
            Ok(session) => {
                let session = Arc::new(session);
                self.set_session(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Some(session)
            }
            Err(err) => {
                tracing::warn!("Session refresh failed: {err}");
                self.set_session(AuthChangeEvent::SignedOut, None);
                None
            }
        }
    }

    /// Bearer token for storage requests: the session's, else the anon key.
    pub(crate) async fn bearer(&self) -> String {
        match self.get_session().await {
            Ok(Some(session)) => session.access_token.clone(),
            _ => self.anon_key.clone(),
        }
    }
}

#[async_trait]
impl AuthBackend for BackendClient {
    async fn get_session(&self) -> Result<Option<Arc<Session>>, BackendError> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };
        let margin = chrono::Duration::seconds(REFRESH_MARGIN_SECS);
        if session.expires_within(Utc::now(), margin) && session.refresh_token.is_some() {
            return Ok(self.refresh(&session).await);
        }
        Ok(Some(session))
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let session = self
            .grant("password", &PasswordCredentials { email, password })
            .await?;
        tracing::debug!(user = %session.user.id, "Signed in");
        self.set_session(AuthChangeEvent::SignedIn, Some(Arc::new(session)));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .json(&PasswordCredentials { email, password }),
            )
            .await?;
        let body: SignUpBody = response.json().await.map_err(decode)?;
        let (user_id, token) = body.into_parts();

        if let Some(token) = token {
            let session = token.into_session(Utc::now());
            self.set_session(AuthChangeEvent::SignedIn, Some(Arc::new(session)));
        } else {
            tracing::debug!("Sign-up pending email confirmation");
        }
        Ok(SignUpResponse { user_id })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = match self.stored_session() {
            Some(session) => {
                let url = self.endpoint("auth/v1/logout")?;
                let request = self
                    .request(Method::POST, url)
                    .bearer_auth(&session.access_token);
                match self.send(request).await {
                    Ok(_) => Ok(()),
                    // The session is already gone on the server side.
                    Err(BackendError::Api { status, .. })
                        if status == StatusCode::UNAUTHORIZED.as_u16()
                            || status == StatusCode::FORBIDDEN.as_u16()
                            || status == StatusCode::NOT_FOUND.as_u16() =>
                    {
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            None => Ok(()),
        };
        self.set_session(AuthChangeEvent::SignedOut, None);
        result
    }
}
