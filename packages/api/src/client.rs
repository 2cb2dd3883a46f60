//! The backend client and its process-wide instance.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use store::config::TablesConfig;
use store::{AppConfig, AuthChangeEvent, AuthEventHub, BackendError, Session};
use url::Url;

use crate::error::{network, response_error};

static CLIENT: OnceLock<Arc<BackendClient>> = OnceLock::new();

/// Get or initialize the shared client.
/// Reads configuration through [`AppConfig::load`] on first use.
pub fn client() -> Result<Arc<BackendClient>, BackendError> {
    if let Some(client) = CLIENT.get() {
        return Ok(client.clone());
    }
    let config = AppConfig::load()?;
    init(&config)
}

/// Initialize the shared client from an explicit configuration.
/// Later calls return the first instance and ignore `config`.
pub fn init(config: &AppConfig) -> Result<Arc<BackendClient>, BackendError> {
    if let Some(client) = CLIENT.get() {
        return Ok(client.clone());
    }
    let client = Arc::new(BackendClient::new(config)?);
    Ok(CLIENT.get_or_init(|| client).clone())
}

/// Client for the hosted auth, storage, and realtime services.
pub struct BackendClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base: Url,
    pub(crate) anon_key: String,
    pub(crate) heartbeat: Duration,
    tables: TablesConfig,
    session: RwLock<Option<Arc<Session>>>,
    pub(crate) events: AuthEventHub,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Result<Self, BackendError> {
        let mut base = config.base_url()?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().build().map_err(network)?;

        tracing::debug!(backend = %base, "Backend client created");
        Ok(Self {
            http,
            base,
            anon_key: config.backend.anon_key.clone(),
            heartbeat: config.heartbeat_interval(),
            tables: config.tables.clone(),
            session: RwLock::new(None),
            events: AuthEventHub::new(),
        })
    }

    /// Collection names this client was configured with.
    pub fn tables(&self) -> &TablesConfig {
        &self.tables
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|err| BackendError::Config(format!("Invalid endpoint {path}: {err}")))
    }

    /// Request builder carrying the `apikey` header.
    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
    }

    /// Send and turn non-success statuses into [`BackendError::Api`].
    pub(crate) async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BackendError> {
        let response = request.send().await.map_err(network)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(response_error(response).await)
        }
    }

    pub(crate) fn stored_session(&self) -> Option<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the held session and notify listeners.
    pub(crate) fn set_session(&self, kind: AuthChangeEvent, session: Option<Arc<Session>>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session.clone();
        self.events.emit(kind, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_base_path() {
        let client = BackendClient::new(&AppConfig::new("https://abc.example.co", "anon")).unwrap();
        assert_eq!(
            client.endpoint("auth/v1/token").unwrap().as_str(),
            "https://abc.example.co/auth/v1/token"
        );

        let proxied =
            BackendClient::new(&AppConfig::new("https://proxy.example.co/backend", "anon"))
                .unwrap();
        assert_eq!(
            proxied.endpoint("rest/v1/links").unwrap().as_str(),
            "https://proxy.example.co/backend/rest/v1/links"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = BackendClient::new(&AppConfig::new("::nope", "anon"));
        assert!(matches!(result, Err(BackendError::Config(_))));
    }
}
