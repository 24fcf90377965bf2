//! The update source seam.
//!
//! Defines the [`UpdateSource`] trait the relay loop polls. The Telegram
//! client in `tgrelay-core` implements it; tests provide scripted sources.

use async_trait::async_trait;
use thiserror::Error;

use crate::update::{Cursor, Update};

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Why a fetch produced no batch.
///
/// An empty batch is never an error; every variant here means the remote
/// could not be read and the cursor must stay where it is.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote answered with `ok: false`.
    #[error(
        "remote API error [{}]: {description}",
        .code.map_or_else(|| "?".to_string(), |c| c.to_string())
    )]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// Connection refused, reset, timed out, or the body could not be read.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The body arrived but is not a valid API response.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The source panicked while fetching.
    #[error("fetch aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    /// True for failures that happened below the API layer.
    ///
    /// Malformed responses count as transport-class.
    pub fn is_transport_class(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Malformed(_))
    }
}

/// A source of pending updates, read by offset.
///
/// A call may block for a server-side long-poll interval.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch the updates after `cursor`.
    ///
    /// An unset cursor fetches from the start of the retention window.
    /// The returned batch may be empty and may be in any id order.
    async fn fetch(&self, cursor: Cursor) -> FetchResult<Vec<Update>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_code_and_description() {
        let err = FetchError::Api {
            code: Some(409),
            description: "Conflict: terminated by other getUpdates request".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote API error [409]: Conflict: terminated by other getUpdates request"
        );
    }

    #[test]
    fn api_error_without_code() {
        let err = FetchError::Api {
            code: None,
            description: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "remote API error [?]: Unauthorized");
    }

    #[test]
    fn transport_class_classification() {
        assert!(FetchError::Transport("refused".into()).is_transport_class());
        assert!(FetchError::Malformed("eof".into()).is_transport_class());
        assert!(!FetchError::Aborted("boom".into()).is_transport_class());
        assert!(
            !FetchError::Api {
                code: Some(401),
                description: "Unauthorized".into()
            }
            .is_transport_class()
        );
    }

    struct FixedSource(Vec<Update>);

    #[async_trait]
    impl UpdateSource for FixedSource {
        async fn fetch(&self, cursor: Cursor) -> FetchResult<Vec<Update>> {
            let from = cursor.offset().unwrap_or(i64::MIN);
            Ok(self
                .0
                .iter()
                .filter(|u| u.update_id >= from)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn source_is_usable_as_trait_object() {
        let source: Box<dyn UpdateSource> =
            Box::new(FixedSource(vec![Update::new(1), Update::new(2)]));

        assert_eq!(source.fetch(Cursor::UNSET).await.unwrap().len(), 2);
        assert_eq!(source.fetch(Cursor::at(2)).await.unwrap().len(), 1);
    }
}
