//! Relay configuration.
//!
//! Loaded once at startup from `tgrelay.yml` (or the `--config` path), with
//! environment overrides for secrets, then validated. The resulting
//! [`RelayConfig`] is passed by reference into [`crate::TelegramApi`] and
//! [`crate::HttpSink`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::DEFAULT_API_BASE;
use crate::error::{ConfigError, ConfigResult};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tgrelay.yml";

/// Environment variable that overrides `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "TGRELAY_BOT_TOKEN";

/// Environment variable that overrides `telegram.webhook_url`.
pub const WEBHOOK_URL_ENV: &str = "TGRELAY_WEBHOOK_URL";

/// Sink path written by the project template; must be replaced before use.
pub const SINK_PATH_PLACEHOLDER: &str = "/your-app/region/your-function-name";

const BOT_TOKEN_PLACEHOLDERS: &[&str] = &["YOUR_BOT_TOKEN", "<bot-token>"];

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub sink: SinkConfig,
    pub relay: LoopConfig,
}

/// Bot API access.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,

    /// Scheme and host of the Bot API, without a trailing slash.
    pub api_base: String,

    /// Long-poll timeout sent with `getUpdates`. 0 asks for a short poll.
    pub poll_timeout_secs: u64,

    pub webhook_url: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: 0,
            webhook_url: None,
        }
    }
}

impl TelegramConfig {
    /// The bot token with everything but the first and last four characters hidden.
    pub fn bot_token_masked(&self) -> String {
        mask_token(&self.bot_token)
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token_masked())
            .field("api_base", &self.api_base)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("webhook_url", &self.webhook_url)
            .finish()
    }
}

/// The downstream endpoint every update is POSTed to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    pub path: String,

    /// Treat any HTTP response as a successful delivery, whatever its status.
    pub accept_any_status: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5001,
            path: String::new(),
            accept_any_status: false,
        }
    }
}

impl SinkConfig {
    /// Full URL of the endpoint, `http://<host>:<port><path>`.
    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Pacing of the relay loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Delay between cycles when the last fetch succeeded.
    pub poll_interval_ms: u64,

    /// Upper bound for the delay after consecutive fetch failures.
    pub max_backoff_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

impl LoopConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl RelayConfig {
    /// Load, apply environment overrides, and validate.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read if present; otherwise the defaults plus environment are used.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        let config = config.with_overrides(
            std::env::var(BOT_TOKEN_ENV).ok(),
            std::env::var(WEBHOOK_URL_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file without validating it.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from(path),
            source,
        })
    }

    /// Parse YAML text without validating it.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as null, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Apply secret overrides. Empty values are ignored.
    pub fn with_overrides(mut self, bot_token: Option<String>, webhook_url: Option<String>) -> Self {
        if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            self.telegram.webhook_url = Some(url);
        }
        self
    }

    /// Reject missing, placeholder, or unusable values.
    pub fn validate(&self) -> ConfigResult<()> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        if BOT_TOKEN_PLACEHOLDERS.contains(&token) {
            return Err(ConfigError::Placeholder {
                field: "telegram.bot_token",
                value: token.to_string(),
            });
        }
        if token.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ConfigError::Invalid {
                field: "telegram.bot_token",
                reason: "must not contain whitespace or '/'".to_string(),
            });
        }

        let api_base = self.telegram.api_base.trim();
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "telegram.api_base",
                reason: format!("{api_base:?} is not an http(s) URL"),
            });
        }

        let path = self.sink.path.trim();
        if path.is_empty() {
            return Err(ConfigError::MissingSinkPath);
        }
        if path == SINK_PATH_PLACEHOLDER {
            return Err(ConfigError::Placeholder {
                field: "sink.path",
                value: path.to_string(),
            });
        }
        if !path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "sink.path",
                reason: format!("{path:?} must start with '/'"),
            });
        }
        if self.sink.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "sink.host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.sink.port == 0 {
            return Err(ConfigError::Invalid {
                field: "sink.port",
                reason: "must not be 0".to_string(),
            });
        }

        if self.relay.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// The configured webhook URL, required by `--web-hook`.
    pub fn webhook_url(&self) -> ConfigResult<&str> {
        self.telegram
            .webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingWebhookUrl)
    }
}

pub(crate) fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
