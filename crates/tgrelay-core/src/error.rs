use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors that prevent the relay from starting.
///
/// Every variant is fatal: the process exits before the loop runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::RelayConfig`].
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Bot token is missing from config and environment.
    #[error(
        "telegram bot token not found: set TGRELAY_BOT_TOKEN or configure telegram.bot_token"
    )]
    MissingBotToken,

    /// The downstream path that receives updates is not set.
    #[error("sink path not configured: set sink.path to the endpoint that receives updates")]
    MissingSinkPath,

    /// A field still holds the value from the generated template.
    #[error("{field} still holds the placeholder value {value:?}")]
    Placeholder { field: &'static str, value: String },

    /// A field is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// `--web-hook` was requested without a webhook URL.
    #[error(
        "webhook url not configured: set TGRELAY_WEBHOOK_URL or configure telegram.webhook_url"
    )]
    MissingWebhookUrl,
}
