//! HTTP client and progress monitoring for the download-and-trim backend.
//!
//! - [`api`] wraps the backend endpoints.
//! - [`messages`] holds response bodies and the event-stream decoder.
//! - [`monitor`] follows a job by polling or by subscribing to its events.
//! - [`events`] forwards monitor callbacks onto a channel.

pub mod api;
pub mod events;
pub mod messages;
pub mod monitor;

pub use api::{ApiError, BackendApi, JobStarted};
pub use monitor::{
    MonitorOptions, MonitorOutcome, ProgressMonitor, ProgressObserver, Transport,
};
