//! Mapping transport and response failures onto [`BackendError`].

use serde_json::Value;
use store::BackendError;
use thiserror::Error;

/// Keys the auth, storage, and realtime services use for their messages.
const MESSAGE_KEYS: &[&str] = &["msg", "message", "error_description", "error"];

pub(crate) fn network(err: reqwest::Error) -> BackendError {
    BackendError::Network(err.to_string())
}

pub(crate) fn decode(err: impl std::fmt::Display) -> BackendError {
    BackendError::Decode(err.to_string())
}

/// Pull the service's message out of an error body, falling back to the
/// status text.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            MESSAGE_KEYS
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

pub(crate) async fn response_error(response: reqwest::Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    tracing::debug!(status = status.as_u16(), "Backend error: {message}");
    BackendError::api(status.as_u16(), message)
}

/// Failures of the realtime websocket.
#[derive(Debug, Error)]
pub(crate) enum RealtimeError {
    #[error("websocket: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("frame encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid realtime url: {0}")]
    Url(String),
}

impl From<RealtimeError> for BackendError {
    fn from(err: RealtimeError) -> Self {
        BackendError::Realtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_message_key_precedence() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"code":400,"msg":"Invalid login credentials"}"#
            ),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#
            ),
            "Email not confirmed"
        );
        assert_eq!(
            error_message(
                StatusCode::FORBIDDEN,
                r#"{"code":"42501","message":"new row violates row-level security policy for table \"links\""}"#
            ),
            "new row violates row-level security policy for table \"links\""
        );
    }

    #[test]
    fn test_fallback_to_status_text() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream</html>"),
            "Bad Gateway"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, "{}"), "Not Found");
    }
}
