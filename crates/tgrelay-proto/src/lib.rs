//! # tgrelay-proto
//!
//! Shared types, error definitions, and traits for tgrelay.
//!
//! This crate provides the abstractions the relay loop is written against:
//! - [`Update`] and [`Cursor`] — the event payload and the offset watermark
//! - [`UpdateSource`] — fetches pending updates after a cursor
//! - [`DeliverySink`] — forwards a single update downstream
//! - [`FetchError`] / [`DeliveryError`] — typed failures for both seams

mod sink;
mod source;
mod update;

pub use sink::{DeliveryError, DeliveryResult, DeliverySink};
pub use source::{FetchError, FetchResult, UpdateSource};
pub use update::{Cursor, Update, max_update_id};
