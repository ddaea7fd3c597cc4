use std::path::{Path, PathBuf};
use std::time::Duration;

use marquee_model::routes::v1;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::api::normalize_base_url;
use crate::auth::AuthToken;
use crate::channel::ChannelSettings;
use crate::error::LibraryError;

pub const ENV_SERVER_URL: &str = "MARQUEE_SERVER_URL";
pub const ENV_EVENTS_URL: &str = "MARQUEE_EVENTS_URL";
pub const ENV_INSECURE_CHANNEL: &str = "MARQUEE_INSECURE_CHANNEL";
pub const ENV_TOKEN: &str = "MARQUEE_TOKEN";

const APP_DIR: &str = "marquee";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no config directory on this platform")]
    NoConfigDir,

    #[error("invalid server URL {url:?}: {source}")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build library client: {0}")]
    Client(#[from] LibraryError),

    #[error("{name} must be true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    /// Push endpoint; derived from `server_url` when unset.
    pub events_url: Option<String>,
    /// Attach the push channel. Derived from the server URL scheme when
    /// unset: plain `http` allows it, `https` does not.
    pub insecure_channel_allowed: Option<bool>,
    pub request_timeout_secs: u64,
    pub channel_max_retries: u32,
    /// Only ever taken from the environment or the command line.
    #[serde(skip)]
    pub token: Option<AuthToken>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            events_url: None,
            insecure_channel_allowed: None,
            request_timeout_secs: 30,
            channel_max_retries: 10,
            token: None,
        }
    }
}

impl ClientConfig {
    /// `<config_dir>/marquee/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Defaults, then the config file, then `MARQUEE_*` environment
    /// variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let mut config = Self::load_from(path.as_deref())?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read `path` on top of the defaults. A missing file is not an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|source| {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        let config = serde_json::from_str::<Self>(&content).map_err(
            |source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
        )?;
        info!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Apply `MARQUEE_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(url) = lookup(ENV_EVENTS_URL) {
            self.events_url = Some(url);
        }
        if let Some(value) = lookup(ENV_INSECURE_CHANNEL) {
            self.insecure_channel_allowed =
                Some(parse_flag(ENV_INSECURE_CHANNEL, &value)?);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.token = Some(AuthToken::new(token));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn normalized_server_url(&self) -> String {
        normalize_base_url(&self.server_url)
    }

    fn parsed_server_url(&self) -> Result<Url, ConfigError> {
        let normalized = self.normalized_server_url();
        Url::parse(&normalized).map_err(|source| {
            ConfigError::InvalidServerUrl {
                url: normalized,
                source,
            }
        })
    }

    pub fn insecure_channel_allowed(&self) -> Result<bool, ConfigError> {
        match self.insecure_channel_allowed {
            Some(allowed) => Ok(allowed),
            None => Ok(self.parsed_server_url()?.scheme() == "http"),
        }
    }

    /// `ws://{server host}:3012/events/library` unless configured.
    pub fn events_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.events_url {
            return Ok(url.clone());
        }

        let server = self.parsed_server_url()?;
        let scheme = if server.scheme() == "https" { "wss" } else { "ws" };
        let host = server.host_str().unwrap_or("localhost");
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        Ok(format!(
            "{scheme}://{host}:{}{}",
            v1::events::DEFAULT_PORT,
            v1::events::LIBRARY
        ))
    }

    pub fn channel_settings(&self) -> Result<ChannelSettings, ConfigError> {
        let settings = ChannelSettings {
            url: self.events_url()?,
            insecure_channel_allowed: self.insecure_channel_allowed()?,
            max_retries: self.channel_max_retries,
        };
        info!(
            url = %settings.url,
            insecure_channel_allowed = settings.insecure_channel_allowed,
            "event channel settings"
        );
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}
