//! Backend response bodies and the server-sent event decoder.
//!
//! The backend answers JSON envelopes shaped `{"success": bool, ...}`.
//! Progress streams arrive as `text/event-stream` where each event's
//! `data:` lines carry one JSON progress payload.

use std::collections::VecDeque;

use cliptrim_core::progress::ProgressPayload;
use cliptrim_core::types::ProcessId;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::api::{ApiError, JobStarted};

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// Minimal envelope used to pull a message out of a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /get-duration/{filename}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DurationResponse {
    pub success: bool,
    /// `HH:MM:SS`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /download-video` and `POST /process-video`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStartedResponse {
    pub success: bool,
    #[serde(default)]
    pub process_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Stored name of a downloaded video.
    #[serde(default)]
    pub filename: Option<String>,
    /// `HH:MM:SS` duration of a downloaded video.
    #[serde(default)]
    pub duration: Option<String>,
}

impl JobStartedResponse {
    /// Turn the envelope into a started job, or the backend's refusal.
    pub fn into_job(self) -> Result<JobStarted, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "Request failed".to_string()),
            ));
        }
        let raw_id = self
            .process_id
            .ok_or_else(|| ApiError::Malformed("process_id missing from response".to_string()))?;
        let process_id = ProcessId::new(raw_id).map_err(|e| ApiError::Malformed(e.to_string()))?;

        Ok(JobStarted {
            process_id,
            message: self.message,
            download_url: self.download_url,
            filename: self.filename,
            duration: self.duration,
        })
    }
}

/// Body of `POST /cleanup`.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Server-sent events
// ---------------------------------------------------------------------------

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Upper bound on the bytes held for one event before it is dropped.
pub const MAX_EVENT_BYTES: usize = 1 << 20;

/// Incremental `text/event-stream` decoder.
///
/// Lines end with `\n`, `\r\n` or a lone `\r`, and a blank line ends an
/// event, so chunk boundaries may fall anywhere, including inside a UTF-8
/// sequence. Comment lines (`:`) and fields other than `data` and `event`
/// are ignored. Events without any `data` line are not dispatched.
///
/// An event that grows past [`MAX_EVENT_BYTES`] is discarded up to its
/// terminating blank line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    held: usize,
    after_cr: bool,
    skip_line: bool,
    discarding: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\r' | b'\n' => {
                    self.after_cr = byte == b'\r';
                    if let Some(event) = self.end_line() {
                        events.push(event);
                    }
                }
                _ if self.skip_line => {}
                _ => {
                    self.line.push(byte);
                    if self.held + self.line.len() > MAX_EVENT_BYTES {
                        tracing::warn!(
                            limit = MAX_EVENT_BYTES,
                            "Dropping oversized server-sent event"
                        );
                        self.reset();
                        self.skip_line = true;
                        self.discarding = true;
                    }
                }
            }
        }
        events
    }

    /// Flush an unterminated trailing event once the stream has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.line);
        let dropped = std::mem::take(&mut self.skip_line) | std::mem::take(&mut self.discarding);
        self.after_cr = false;
        if dropped {
            self.reset();
            return None;
        }
        if !line.is_empty() {
            self.field(&line);
        }
        self.dispatch()
    }

    fn end_line(&mut self) -> Option<SseEvent> {
        if std::mem::take(&mut self.skip_line) {
            return None;
        }
        if self.line.is_empty() {
            if std::mem::take(&mut self.discarding) {
                return None;
            }
            return self.dispatch();
        }
        let line = std::mem::take(&mut self.line);
        if !self.discarding {
            self.field(&line);
        }
        None
    }

    fn field(&mut self, line: &[u8]) {
        if line.first() == Some(&b':') {
            return;
        }
        self.held += line.len();
        let text = String::from_utf8_lossy(line);
        let (name, value) = match text.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (text.as_ref(), ""),
        };
        match name {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        self.held = 0;
        if data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event,
            data: data.join("\n"),
        })
    }

    fn reset(&mut self) {
        self.line.clear();
        self.event = None;
        self.data.clear();
        self.held = 0;
    }
}

/// Parse one event's data as a progress payload.
pub fn parse_progress_event(event: &SseEvent) -> Result<ProgressPayload, ApiError> {
    serde_json::from_str(&event.data)
        .map_err(|e| ApiError::Malformed(format!("{e}: {}", event.data)))
}

/// Decode a byte stream of server-sent events into progress payloads.
///
/// Frames that fail to parse surface as [`ApiError::Malformed`] items and
/// the stream continues. A transport error is yielded once and ends the
/// stream.
pub fn progress_events<S, B, E>(bytes: S) -> impl Stream<Item = Result<ProgressPayload, ApiError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<ApiError>,
{
    struct State<S> {
        bytes: S,
        decoder: SseDecoder,
        pending: VecDeque<Result<ProgressPayload, ApiError>>,
        done: bool,
    }

    let state = State {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending
                        .extend(events.iter().map(parse_progress_event));
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.done = true;
                    if let Some(event) = st.decoder.finish() {
                        st.pending.push_back(parse_progress_event(&event));
                    }
                }
            }
        }
    })
}
