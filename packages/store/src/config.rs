//! # Client configuration: `linkstash.toml`
//!
//! Everything needed to construct the single backend client: where the hosted
//! backend lives, the public (anon) key sent with every request, the collection
//! names, and realtime tuning.
//!
//! ## Structure
//!
//! ```toml
//! [backend]
//! url = "https://project.example.co"
//! anon_key = "public-anon-key"
//!
//! [tables]
//! links = "links"          # default
//! profiles = "profiles"    # default
//!
//! [realtime]
//! heartbeat_interval_secs = 30   # default
//! ```
//!
//! ## Sources
//!
//! [`AppConfig::load`] looks for the file at `$LINKSTASH_CONFIG`, then at
//! `<config_dir>/linkstash/linkstash.toml`. A path set through
//! `LINKSTASH_CONFIG` that cannot be read is an error. Otherwise, when no file
//! exists, it falls back to [`AppConfig::from_env`], which reads
//! `LINKSTASH_URL` and `LINKSTASH_ANON_KEY` (a `.env` file is honoured via
//! `dotenvy`). Variables missing at runtime are taken from the same names as
//! they were set when the crate was compiled, which is how mobile builds get
//! their backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const URL_VAR: &str = "LINKSTASH_URL";
pub const ANON_KEY_VAR: &str = "LINKSTASH_ANON_KEY";
pub const CONFIG_PATH_VAR: &str = "LINKSTASH_CONFIG";

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// Credentials required to construct the backend client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://project.example.co`.
    pub url: String,
    /// Public key sent as `apikey` on every request.
    pub anon_key: String,
}

/// Collection names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_links_table")]
    pub links: String,
    #[serde(default = "default_profiles_table")]
    pub profiles: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds between websocket heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_links_table() -> String {
    "links".to_string()
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            links: default_links_table(),
            profiles: default_profiles_table(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl AppConfig {
    /// Config with default tables and realtime settings.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: url.into(),
                anon_key: anon_key.into(),
            },
            tables: TablesConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "linkstash.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read `LINKSTASH_URL` and `LINKSTASH_ANON_KEY`, falling back to the
    /// values baked in at build time.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_sources(|name| std::env::var(name).ok(), built_in_var)
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(URL_VAR))?;
        let anon_key = lookup(ANON_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ANON_KEY_VAR))?;
        Ok(Self::new(url, anon_key))
    }

    /// Like [`AppConfig::from_vars`], taking each variable from `runtime`
    /// first and from `built_in` when `runtime` has no usable value.
    pub fn from_sources(
        runtime: impl Fn(&str) -> Option<String>,
        built_in: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_vars(|name| {
            runtime(name)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| built_in(name))
        })
    }

    /// Load from the config file if one exists, otherwise from the environment.
    ///
    /// A path given through `LINKSTASH_CONFIG` must exist.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
        let default = dirs::config_dir().map(|d| d.join("linkstash").join(Self::filename()));
        Self::load_from(explicit, default, Self::from_env)
    }

    fn load_from(
        explicit: Option<PathBuf>,
        default: Option<PathBuf>,
        fallback: impl FnOnce() -> Result<Self, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let path = match (explicit, default) {
            (Some(path), _) => path,
            (None, Some(path)) if path.is_file() => path,
            (None, _) => return fallback(),
        };

        tracing::debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// The backend base URL, validated.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.backend.url.trim_end_matches('/')).map_err(|source| {
            ConfigError::InvalidUrl {
                url: self.backend.url.clone(),
                source,
            }
        })
    }

    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.realtime.heartbeat_interval_secs.max(1))
    }
}

/// Backend settings compiled into the binary, for targets without an
/// environment or a config directory.
fn built_in_var(name: &str) -> Option<String> {
    let value = match name {
        URL_VAR => option_env!("LINKSTASH_URL"),
        ANON_KEY_VAR => option_env!("LINKSTASH_ANON_KEY"),
        _ => None,
    };
    value.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [backend]
            url = "https://abc.example.co"
            anon_key = "anon"
            "#,
        )
        .unwrap();
        assert_eq!(config, AppConfig::new("https://abc.example.co", "anon"));
        assert_eq!(config.tables.links, "links");
        assert_eq!(config.tables.profiles, "profiles");
        assert_eq!(config.realtime.heartbeat_interval_secs, 30);
    }

    #[test]
    fn test_toml_overrides() {
        let config = AppConfig::from_toml(
            r#"
            [backend]
            url = "https://abc.example.co"
            anon_key = "anon"

            [tables]
            links = "bookmarks"

            [realtime]
            heartbeat_interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.tables.links, "bookmarks");
        assert_eq!(config.tables.profiles, "profiles");
        assert_eq!(config.heartbeat_interval().as_secs(), 5);
    }

    #[test]
    fn test_missing_backend_section_fails() {
        assert!(matches!(
            AppConfig::from_toml("[tables]\nlinks = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = [
            (URL_VAR, "https://abc.example.co/"),
            (ANON_KEY_VAR, "anon"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.backend.anon_key, "anon");
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://abc.example.co/"
        );

        let err = AppConfig::from_vars(|k| (k == URL_VAR).then(|| "https://x.co".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ANON_KEY_VAR)));
    }

    #[test]
    fn test_built_in_values_fill_gaps() {
        let built = |k: &str| match k {
            URL_VAR => Some("https://built.example.co".to_string()),
            ANON_KEY_VAR => Some("built-anon".to_string()),
            _ => None,
        };

        let config = AppConfig::from_sources(|_| None, built).unwrap();
        assert_eq!(config, AppConfig::new("https://built.example.co", "built-anon"));

        let config = AppConfig::from_sources(
            |k| match k {
                URL_VAR => Some("https://runtime.example.co".to_string()),
                ANON_KEY_VAR => Some(" ".to_string()),
                _ => None,
            },
            built,
        )
        .unwrap();
        assert_eq!(config.backend.url, "https://runtime.example.co");
        assert_eq!(config.backend.anon_key, "built-anon");

        assert!(matches!(
            AppConfig::from_sources(|_| None, |_| None),
            Err(ConfigError::MissingVar(URL_VAR))
        ));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let missing = std::env::temp_dir().join("linkstash-does-not-exist/linkstash.toml");
        let result = AppConfig::load_from(Some(missing), None, || {
            Ok(AppConfig::new("https://env.example.co", "anon"))
        });
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_missing_default_file_falls_back() {
        let missing = std::env::temp_dir().join("linkstash-does-not-exist/linkstash.toml");
        let config = AppConfig::load_from(None, Some(missing), || {
            Ok(AppConfig::new("https://env.example.co", "anon"))
        })
        .unwrap();
        assert_eq!(config.backend.url, "https://env.example.co");

        let config =
            AppConfig::load_from(None, None, || Ok(AppConfig::new("https://env.example.co", "anon")))
                .unwrap();
        assert_eq!(config.backend.anon_key, "anon");
    }

    #[test]
    fn test_explicit_path_is_read() {
        let dir = std::env::temp_dir().join(format!("linkstash-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(AppConfig::filename());
        std::fs::write(
            &path,
            "[backend]\nurl = \"https://file.example.co\"\nanon_key = \"file-anon\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(path), None, || unreachable!()).unwrap();
        assert_eq!(config.backend.url, "https://file.example.co");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_url() {
        let config = AppConfig::new("not a url", "anon");
        assert!(matches!(
            config.base_url(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
