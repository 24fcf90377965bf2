//! Telegram Bot API client.
//!
//! Implements exactly what the relay needs: `getUpdates` as an
//! [`UpdateSource`], plus `getWebhookInfo`/`setWebhook` for the one-shot
//! webhook registration command.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tgrelay_proto::{Cursor, FetchError, FetchResult, Update, UpdateSource};
use tracing::{debug, info, warn};

use crate::config::{TelegramConfig, mask_token};

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Headroom added on top of the long-poll timeout for the HTTP client.
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Split the envelope into the result or a typed error.
    ///
    /// `ok: true` without a `result` is malformed, never an empty success.
    pub fn into_result(self) -> FetchResult<T> {
        if !self.ok {
            return Err(FetchError::Api {
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        self.result.ok_or_else(|| {
            FetchError::Malformed("response marked ok but carries no result".to_string())
        })
    }
}

/// Parse a raw Bot API response body.
pub fn parse_response<T: DeserializeOwned>(body: &str) -> FetchResult<T> {
    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    envelope.into_result()
}

/// Convert a `getUpdates` result item by item.
///
/// An item without an integer `update_id` is logged and dropped, so it cannot
/// hold back the rest of the batch or the cursor.
pub fn parse_update_batch(items: Vec<Value>) -> Vec<Update> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Update>(item) {
            Ok(update) => Some(update),
            Err(error) => {
                warn!(index, error = %error, "Dropping update without a valid update_id");
                None
            }
        })
        .collect()
}

/// Client for the handful of Bot API methods the relay calls.
pub struct TelegramApi {
    client: Client,
    api_base: String,
    bot_token: String,
    poll_timeout_secs: u64,
}

impl TelegramApi {
    pub fn new(config: &TelegramConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(
                Duration::from_secs(config.poll_timeout_secs).saturating_add(CLIENT_TIMEOUT_MARGIN),
            )
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Call a method with GET and unwrap its envelope.
    ///
    /// The body is parsed whatever the HTTP status: Telegram reports
    /// application errors as 4xx with a JSON envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> FetchResult<T> {
        let response = self
            .client
            .get(self.method_url(method))
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        parse_response(&body).map_err(|e| match e {
            FetchError::Malformed(reason) => {
                FetchError::Malformed(format!("{method} returned HTTP {status}: {reason}"))
            }
            other => other,
        })
    }

    /// `getUpdates` after `cursor`. The offset is omitted while the cursor is unset.
    pub async fn get_updates(&self, cursor: Cursor) -> FetchResult<Vec<Update>> {
        let mut query = Vec::with_capacity(2);
        if let Some(offset) = cursor.offset() {
            query.push(("offset", offset.to_string()));
        }
        if self.poll_timeout_secs > 0 {
            query.push(("timeout", self.poll_timeout_secs.to_string()));
        }

        let items: Vec<Value> = self.call("getUpdates", &query).await?;
        let received = items.len();
        let updates = parse_update_batch(items);
        debug!(
            cursor = %cursor,
            received,
            count = updates.len(),
            "Fetched updates"
        );
        Ok(updates)
    }

    pub async fn get_webhook_info(&self) -> FetchResult<Value> {
        self.call("getWebhookInfo", &[]).await
    }

    pub async fn set_webhook(&self, url: &str) -> FetchResult<bool> {
        self.call("setWebhook", &[("url", url.to_string())]).await
    }

    /// Point the bot's webhook at `url`, logging the webhook info before and after.
    pub async fn register_webhook(&self, url: &str) -> FetchResult<()> {
        info!("Start setting web hook");

        let before = self.get_webhook_info().await?;
        info!(webhook = %before, "Current webhook");

        self.set_webhook(url).await?;
        info!(url = %url, "Webhook set");

        let after = self.get_webhook_info().await?;
        info!(webhook = %after, "Updated webhook");
        Ok(())
    }

    /// The bot token masked for logging.
    pub fn bot_token_masked(&self) -> String {
        mask_token(&self.bot_token)
    }
}

/// reqwest errors embed the request URL, which carries the bot token.
fn transport_error(err: reqwest::Error) -> FetchError {
    FetchError::Transport(err.without_url().to_string())
}

#[async_trait]
impl UpdateSource for TelegramApi {
    async fn fetch(&self, cursor: Cursor) -> FetchResult<Vec<Update>> {
        self.get_updates(cursor).await
    }
}

impl fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramApi")
            .field("api_base", &self.api_base)
            .field("bot_token", &self.bot_token_masked())
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish_non_exhaustive()
    }
}
