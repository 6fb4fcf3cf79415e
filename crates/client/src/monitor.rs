//! Job progress monitoring.
//!
//! A [`ProgressMonitor`] follows one backend job until it reaches a
//! terminal status, reporting every observed payload to a
//! [`ProgressObserver`]. Two transports are supported:
//!
//! - [`Transport::Poll`] asks `GET /check-progress/{id}` once per interval.
//! - [`Transport::Stream`] subscribes to `GET /progress/{id}` and reacts to
//!   each pushed event.
//!
//! Whatever the transport, an observer receives at most one terminal
//! callback (`on_complete` or `on_error`) and nothing after it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use cliptrim_core::error::CoreError;
use cliptrim_core::progress::{JobStatus, ProgressPayload, ProgressView};
use cliptrim_core::types::ProcessId;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, BackendApi};

/// Message reported when a poll request fails at the transport level.
pub const POLL_FAILURE_MESSAGE: &str = "Failed to check progress";

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Decoded payloads pushed by the backend for one job.
pub type ProgressStream = BoxStream<'static, Result<ProgressPayload, ApiError>>;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Answers one status query per call.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn check_progress(&self, process_id: &ProcessId) -> Result<ProgressPayload, ApiError>;
}

/// Opens a push channel of status payloads.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open_progress_stream(&self, process_id: &ProcessId)
        -> Result<ProgressStream, ApiError>;
}

#[async_trait]
impl StatusSource for BackendApi {
    async fn check_progress(&self, process_id: &ProcessId) -> Result<ProgressPayload, ApiError> {
        BackendApi::check_progress(self, process_id).await
    }
}

#[async_trait]
impl EventSource for BackendApi {
    async fn open_progress_stream(
        &self,
        process_id: &ProcessId,
    ) -> Result<ProgressStream, ApiError> {
        BackendApi::open_progress_stream(self, process_id).await
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives the progress of one monitored job.
pub trait ProgressObserver: Send {
    /// A non-terminal payload was observed.
    fn on_progress(&mut self, payload: &ProgressPayload);

    /// The job finished. Called at most once.
    fn on_complete(&mut self, payload: ProgressPayload);

    /// The job failed or could not be monitored. Called at most once.
    fn on_error(&mut self, message: String);
}

/// Adapts three closures into a [`ProgressObserver`].
pub struct Callbacks<P, C, E> {
    pub on_progress: P,
    pub on_complete: C,
    pub on_error: E,
}

impl<P, C, E> ProgressObserver for Callbacks<P, C, E>
where
    P: FnMut(&ProgressPayload) + Send,
    C: FnMut(ProgressPayload) + Send,
    E: FnMut(String) + Send,
{
    fn on_progress(&mut self, payload: &ProgressPayload) {
        (self.on_progress)(payload)
    }

    fn on_complete(&mut self, payload: ProgressPayload) {
        (self.on_complete)(payload)
    }

    fn on_error(&mut self, message: String) {
        (self.on_error)(message)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How status updates are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Poll,
    Stream,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" | "polling" => Ok(Self::Poll),
            "stream" | "sse" | "push" => Ok(Self::Stream),
            other => Err(CoreError::Validation(format!(
                "Unknown transport '{other}', expected 'poll' or 'stream'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Delay between polls. Ignored by the stream transport.
    pub interval: Duration,
    pub transport: Transport,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            transport: Transport::default(),
        }
    }
}

/// How a monitoring run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// `on_complete` was called.
    Completed,
    /// `on_error` was called.
    Failed,
    /// The cancel token fired first; no terminal callback was made.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Follows a single job. Create one per job; cancelling it stops only
/// that job's monitoring.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    options: MonitorOptions,
    cancel: CancellationToken,
}

impl ProgressMonitor {
    pub fn new(options: MonitorOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> MonitorOptions {
        self.options
    }

    /// Token that stops this monitor when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Monitor `process_id` with the configured transport.
    pub async fn watch<S, O>(
        &self,
        source: &S,
        process_id: &ProcessId,
        observer: &mut O,
    ) -> MonitorOutcome
    where
        S: StatusSource + EventSource + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        match self.options.transport {
            Transport::Poll => self.poll(source, process_id, observer).await,
            Transport::Stream => self.stream(source, process_id, observer).await,
        }
    }

    /// Pull strategy: one status query per tick.
    ///
    /// The first query is issued immediately. A transport failure ends
    /// monitoring with [`POLL_FAILURE_MESSAGE`]; there is no retry.
    pub async fn poll<S, O>(
        &self,
        source: &S,
        process_id: &ProcessId,
        observer: &mut O,
    ) -> MonitorOutcome
    where
        S: StatusSource + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        tracing::info!(
            process_id = %process_id,
            interval_ms = self.options.interval.as_millis() as u64,
            "Polling job progress",
        );

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(process_id),
                result = source.check_progress(process_id) => result,
            };

            let payload = match result {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(process_id = %process_id, error = %e, "Progress check failed");
                    observer.on_error(POLL_FAILURE_MESSAGE.to_string());
                    return MonitorOutcome::Failed;
                }
            };

            if let Some(outcome) = report(process_id, payload, observer) {
                return outcome;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(process_id),
                _ = tokio::time::sleep(self.options.interval) => {}
            }
        }
    }

    /// Push strategy: react to each event the backend sends.
    ///
    /// Failing to open the stream is an error. Once open, malformed frames
    /// are skipped, and a stream that ends without a terminal status
    /// (closed or broken) completes with the last payload seen, marked
    /// `complete`.
    pub async fn stream<S, O>(
        &self,
        source: &S,
        process_id: &ProcessId,
        observer: &mut O,
    ) -> MonitorOutcome
    where
        S: EventSource + ?Sized,
        O: ProgressObserver + ?Sized,
    {
        tracing::info!(process_id = %process_id, "Subscribing to job progress stream");

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.cancelled(process_id),
            opened = source.open_progress_stream(process_id) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(process_id = %process_id, error = %e, "Failed to open progress stream");
                observer.on_error(format!("Failed to open progress stream: {e}"));
                return MonitorOutcome::Failed;
            }
        };

        let mut last: Option<ProgressPayload> = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(process_id),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(payload)) => {
                    let snapshot = (!payload.status.is_terminal()).then(|| payload.clone());
                    if let Some(outcome) = report(process_id, payload, observer) {
                        return outcome;
                    }
                    last = snapshot;
                }
                Some(Err(ApiError::Malformed(detail))) => {
                    tracing::warn!(process_id = %process_id, detail = %detail, "Skipping malformed progress event");
                }
                Some(Err(e)) => {
                    tracing::warn!(process_id = %process_id, error = %e, "Progress stream broke; treating job as finished");
                    break;
                }
                None => {
                    tracing::info!(process_id = %process_id, "Progress stream closed without a terminal status");
                    break;
                }
            }
        }
        drop(stream);

        let mut payload = last.unwrap_or_default();
        payload.status = JobStatus::Complete;
        observer.on_complete(payload);
        MonitorOutcome::Completed
    }

    fn cancelled(&self, process_id: &ProcessId) -> MonitorOutcome {
        tracing::info!(process_id = %process_id, "Progress monitoring cancelled");
        MonitorOutcome::Cancelled
    }
}

/// Route one payload to the observer. Returns the outcome when the payload
/// was terminal.
fn report<O>(
    process_id: &ProcessId,
    payload: ProgressPayload,
    observer: &mut O,
) -> Option<MonitorOutcome>
where
    O: ProgressObserver + ?Sized,
{
    match payload.status {
        JobStatus::Complete => {
            tracing::info!(process_id = %process_id, "Job complete");
            observer.on_complete(payload);
            Some(MonitorOutcome::Completed)
        }
        JobStatus::Error => {
            let message = payload.error_message();
            tracing::warn!(process_id = %process_id, error = %message, "Job failed");
            observer.on_error(message);
            Some(MonitorOutcome::Failed)
        }
        JobStatus::Running | JobStatus::Unknown => {
            let view = ProgressView::from_payload(&payload);
            tracing::debug!(
                process_id = %process_id,
                status = ?payload.status,
                percent = ?view.percent,
                stage = %view.stage,
                "Job progress",
            );
            observer.on_progress(&payload);
            None
        }
    }
}
