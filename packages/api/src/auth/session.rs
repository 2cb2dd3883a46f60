//! Wire types of the auth service and their conversion into [`Session`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Session, UserInfo};

/// Body of `POST /auth/v1/token` and `POST /auth/v1/signup`.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/v1/token?grant_type=refresh_token`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A granted token pair.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::Duration::seconds(secs))
            });
        Session {
            user: UserInfo {
                id: self.user.id,
                email: self.user.email,
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Sign-up answers with a session when the account is confirmed immediately,
/// or with the bare user when email confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpBody {
    Session(TokenResponse),
    User(AuthUser),
    Wrapped {
        #[serde(default)]
        user: Option<AuthUser>,
        #[serde(default)]
        session: Option<TokenResponse>,
    },
}

impl SignUpBody {
    /// The new user's id and, when granted, the session.
    pub fn into_parts(self) -> (Option<String>, Option<TokenResponse>) {
        match self {
            Self::Session(token) => (Some(token.user.id.clone()), Some(token)),
            Self::User(user) => (Some(user.id), None),
            Self::Wrapped { user, session } => {
                let id = user
                    .map(|u| u.id)
                    .or_else(|| session.as_ref().map(|s| s.user.id.clone()));
                (id, session)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_into_session() {
        let now = Utc::now();
        let body: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": "u1", "email": "a@x.com", "aud": "authenticated" }
        }))
        .unwrap();
        let session = body.into_session(now);
        assert_eq!(session.user.id, "u1");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(session.expires_at, Some(now + chrono::Duration::seconds(3600)));
    }

    #[test]
    fn test_absolute_expiry_wins() {
        let body: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "expires_in": 3600,
            "expires_at": 1_700_000_000,
            "user": { "id": "u1" }
        }))
        .unwrap();
        let session = body.into_session(Utc::now());
        assert_eq!(
            session.expires_at,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn test_sign_up_body_shapes() {
        let pending: SignUpBody = serde_json::from_value(json!({
            "id": "u2",
            "email": "b@x.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        let (id, session) = pending.into_parts();
        assert_eq!(id.as_deref(), Some("u2"));
        assert!(session.is_none());

        let confirmed: SignUpBody = serde_json::from_value(json!({
            "access_token": "jwt",
            "user": { "id": "u3" }
        }))
        .unwrap();
        let (id, session) = confirmed.into_parts();
        assert_eq!(id.as_deref(), Some("u3"));
        assert!(session.is_some());

        let wrapped: SignUpBody =
            serde_json::from_value(json!({ "user": { "id": "u4" }, "session": null })).unwrap();
        assert_eq!(wrapped.into_parts().0.as_deref(), Some("u4"));

        let empty: SignUpBody = serde_json::from_value(json!({})).unwrap();
        let (id, session) = empty.into_parts();
        assert!(id.is_none());
        assert!(session.is_none());
    }
}
