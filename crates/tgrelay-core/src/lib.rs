//! # tgrelay-core
//!
//! Polls the Telegram Bot API for updates and forwards each one to a single
//! downstream HTTP endpoint.
//!
//! ## Key Components
//!
//! - [`RelayConfig`] — Config file + environment loading and startup validation
//! - [`TelegramApi`] — `getUpdates` as an [`UpdateSource`], plus webhook registration
//! - [`HttpSink`] — POSTs each update as JSON, a [`DeliverySink`]
//! - [`RelayLoop`] — Owns the cursor and runs fetch/deliver cycles until stopped
//! - [`Backoff`] — Fixed poll interval, doubled per consecutive fetch failure
//!
//! [`UpdateSource`]: tgrelay_proto::UpdateSource
//! [`DeliverySink`]: tgrelay_proto::DeliverySink

mod api;
mod backoff;
pub mod config;
mod error;
mod relay;
mod sink;

pub use api::{ApiResponse, DEFAULT_API_BASE, TelegramApi, parse_response, parse_update_batch};
pub use backoff::Backoff;
pub use config::{LoopConfig, RelayConfig, SinkConfig, TelegramConfig};
pub use error::{ConfigError, ConfigResult};
pub use relay::{CycleReport, RelayHandle, RelayLoop};
pub use sink::HttpSink;
pub use tgrelay_proto::{
    Cursor, DeliveryError, DeliverySink, FetchError, Update, UpdateSource,
};
