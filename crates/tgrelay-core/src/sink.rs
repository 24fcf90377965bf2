//! HTTP delivery sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tgrelay_proto::{DeliveryError, DeliveryResult, DeliverySink, Update};
use tracing::{debug, warn};

use crate::config::SinkConfig;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs each update as JSON to `http://<host>:<port><path>`.
///
/// A request that never completes is always a failure. A non-2xx response,
/// or a response whose body cannot be read, is a failure unless
/// `accept_any_status` is set, in which case it is only logged.
#[derive(Debug)]
pub struct HttpSink {
    client: Client,
    url: String,
    accept_any_status: bool,
}

impl HttpSink {
    pub fn new(config: &SinkConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(DELIVERY_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: config.url(),
            accept_any_status: config.accept_any_status,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DeliverySink for HttpSink {
    async fn send(&self, update: &Update) -> DeliveryResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(update)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) if self.accept_any_status => {
                warn!(
                    update_id = update.update_id,
                    status = %status,
                    error = %error,
                    "Failed to read sink response body"
                );
                String::new()
            }
            Err(error) => {
                return Err(DeliveryError::Transport(format!(
                    "failed to read response body (HTTP {status}): {error}"
                )));
            }
        };
        debug!(
            update_id = update.update_id,
            status = %status,
            body = %body,
            "Sink responded"
        );

        if status.is_success() || self.accept_any_status {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
