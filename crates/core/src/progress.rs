//! Job status payloads reported by the backend and their display form.
//!
//! The same payload shape arrives from `GET /check-progress/{id}` and from
//! each frame of the `GET /progress/{id}` event stream.

use serde::{Deserialize, Serialize};

/// Placeholder shown while the backend has not estimated a value yet.
pub const CALCULATING: &str = "Calculating...";

/// Stage text shown when a payload carries no message.
pub const DEFAULT_STAGE: &str = "Processing video...";

/// Job lifecycle as reported by the backend.
///
/// `Complete` and `Error` are terminal. `Unknown` covers ids the backend
/// has no record of yet and any status string this client does not know;
/// it is treated like `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Complete,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Raw status snapshot for a job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressPayload {
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    /// Percent complete, 0-100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub elapsed: Option<String>,
    #[serde(default)]
    pub remaining: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    /// Present on completed processing jobs.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Fields this client does not interpret, kept for the final payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProgressPayload {
    pub fn with_status(status: JobStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Message for an `error` status, falling back to a generic text.
    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// Display-ready rendering of a [`ProgressPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub stage: String,
    /// Whole percent, capped at 100. `None` when the payload had no value.
    pub percent: Option<u8>,
    pub elapsed: Option<String>,
    pub remaining: String,
    pub speed: String,
}

impl ProgressView {
    pub fn from_payload(payload: &ProgressPayload) -> Self {
        let percent = payload
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8);

        Self {
            stage: non_empty(payload.message.as_deref())
                .unwrap_or(DEFAULT_STAGE)
                .to_string(),
            percent,
            elapsed: non_empty(payload.elapsed.as_deref()).map(str::to_string),
            remaining: non_empty(payload.remaining.as_deref())
                .unwrap_or(CALCULATING)
                .to_string(),
            speed: non_empty(payload.speed.as_deref())
                .unwrap_or(CALCULATING)
                .to_string(),
        }
    }

    /// One-line summary, e.g. `Downloading [42%] elapsed 00:01:10, 00:00:30 left, 2.1 MB/s`.
    pub fn summary(&self) -> String {
        let percent = self
            .percent
            .map(|p| format!(" [{p}%]"))
            .unwrap_or_default();
        let elapsed = self
            .elapsed
            .as_deref()
            .map(|e| format!(" elapsed {e},"))
            .unwrap_or_default();
        format!(
            "{}{percent}{elapsed} {} left, {}",
            self.stage, self.remaining, self.speed
        )
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
