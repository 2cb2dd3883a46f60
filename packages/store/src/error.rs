//! Error types shared by every backend implementation.

use thiserror::Error;

/// Failure reported by the hosted backend or by the transport in front of it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend answered with an error status and message.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The realtime change feed could not be opened or dropped.
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// A response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The client was constructed with unusable settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation requires a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,
}

impl BackendError {
    /// Build an [`BackendError::Api`] from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Text suitable for showing to the user as-is.
    ///
    /// Backend messages are passed through verbatim; transport failures keep
    /// their prefix so the user can tell them apart.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A form field required before any request may be sent is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The URL is required")]
    MissingUrl,
    #[error("The email is required")]
    MissingEmail,
    #[error("The password is required")]
    MissingPassword,
}

/// Errors returned by the auth actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Rejected by the backend. Carries its message verbatim.
    #[error("{0}")]
    Rejected(String),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        Self::Rejected(err.message())
    }
}

/// Errors raised while loading [`crate::AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),

    #[error("Invalid backend URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for BackendError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_is_verbatim() {
        let err = BackendError::api(400, "Invalid login credentials");
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn test_backend_error_becomes_rejection() {
        let err: AuthError = BackendError::api(422, "User already registered").into();
        assert_eq!(err, AuthError::Rejected("User already registered".to_string()));

        let err: AuthError = BackendError::Network("connection refused".into()).into();
        assert_eq!(
            err,
            AuthError::Rejected("Network error: connection refused".to_string())
        );
    }
}
