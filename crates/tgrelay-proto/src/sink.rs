//! The delivery sink seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::update::Update;

/// Result type alias for delivery operations.
pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request never completed (connection refused, reset, timed out).
    #[error("delivery transport failure: {0}")]
    Transport(String),

    /// The endpoint answered with a status the sink does not accept.
    #[error("delivery rejected with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The sink panicked while handling the update.
    #[error("delivery aborted: {0}")]
    Aborted(String),
}

/// Forwards one update downstream.
///
/// Attempts are one-shot: the relay loop never retries a failed delivery.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send(&self, update: &Update) -> DeliveryResult<()>;
}
