//! REST client for the download-and-trim backend.
//!
//! Wraps the backend's HTTP endpoints (duration lookup, download and
//! processing submission, progress polling, the progress event stream,
//! and cleanup) using [`reqwest`].

use std::time::Duration;

use cliptrim_core::progress::ProgressPayload;
use cliptrim_core::submission::{DownloadRequest, ProcessRequest};
use cliptrim_core::types::ProcessId;
use futures::StreamExt;
use reqwest::Url;

use crate::messages::{
    progress_events, CleanupResponse, DurationResponse, Envelope, JobStartedResponse,
};
use crate::monitor::ProgressStream;

/// HTTP client for one backend instance.
#[derive(Debug, Clone)]
pub struct BackendApi {
    client: reqwest::Client,
    base_url: Url,
    /// Applied to every request except the long-lived progress stream.
    request_timeout: Option<Duration>,
}

/// A job the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStarted {
    pub process_id: ProcessId,
    pub message: Option<String>,
    /// Where the finished output can be fetched, when known up front.
    pub download_url: Option<String>,
    /// Stored name of a downloaded video.
    pub filename: Option<String>,
    /// Duration of a downloaded video, `HH:MM:SS`.
    pub duration: Option<String>,
}

/// Transport-level failures: the request never produced a usable answer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status without a readable message.
    #[error("Backend error ({status}): {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The response decoded but is missing required data.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The configured base URL cannot address an endpoint.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendApi {
    /// Create a client for the backend at `base_url`, e.g.
    /// `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            request_timeout: None,
        })
    }

    /// Bound every non-streaming request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Look up a stored video's duration as `HH:MM:SS`.
    ///
    /// Sends `GET /get-duration/{filename}`.
    pub async fn get_duration(&self, filename: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["get-duration", filename])?;
        let body: DurationResponse = self.send_json(self.client.get(url)).await?;

        if !body.success {
            return Err(ApiError::Rejected(
                body.message
                    .unwrap_or_else(|| "Failed to get video duration".to_string()),
            ));
        }
        body.duration
            .ok_or_else(|| ApiError::Malformed("duration missing from response".to_string()))
    }

    /// Start downloading a remote video.
    ///
    /// Sends a form-encoded `POST /download-video`.
    pub async fn download_video(&self, request: &DownloadRequest) -> Result<JobStarted, ApiError> {
        let url = self.endpoint(&["download-video"])?;
        let body: JobStartedResponse = self.send_json(self.client.post(url).form(request)).await?;
        body.into_job()
    }

    /// Submit a trim-and-crop job.
    ///
    /// Sends a JSON `POST /process-video`.
    pub async fn process_video(&self, request: &ProcessRequest) -> Result<JobStarted, ApiError> {
        let url = self.endpoint(&["process-video"])?;
        let body: JobStartedResponse = self.send_json(self.client.post(url).json(request)).await?;
        body.into_job()
    }

    /// Fetch the current status snapshot of a job.
    ///
    /// Sends `GET /check-progress/{process_id}`.
    pub async fn check_progress(&self, process_id: &ProcessId) -> Result<ProgressPayload, ApiError> {
        let url = self.endpoint(&["check-progress", process_id.as_str()])?;
        self.send_json(self.client.get(url)).await
    }

    /// Subscribe to a job's server-sent progress events.
    ///
    /// Sends `GET /progress/{process_id}` and returns the decoded payload
    /// stream. Dropping the stream closes the connection.
    pub async fn open_progress_stream(
        &self,
        process_id: &ProcessId,
    ) -> Result<ProgressStream, ApiError> {
        let url = self.endpoint(&["progress", process_id.as_str()])?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        Ok(progress_events(Box::pin(response.bytes_stream())).boxed())
    }

    /// Delete every stored video on the backend.
    ///
    /// Sends `POST /cleanup` and returns the backend's summary message.
    pub async fn cleanup(&self) -> Result<String, ApiError> {
        let url = self.endpoint(&["cleanup"])?;
        let body: CleanupResponse = self.send_json(self.client.post(url)).await?;
        if body.success {
            Ok(body.message.unwrap_or_else(|| "Cleanup complete".to_string()))
        } else {
            Err(ApiError::Rejected(
                body.message.unwrap_or_else(|| "Cleanup failed".to_string()),
            ))
        }
    }

    /// Absolute URL of a stored file, `GET /download/{filename}`.
    pub fn download_url(&self, filename: &str) -> Result<Url, ApiError> {
        self.endpoint(&["download", filename])
    }

    /// Resolve a backend-relative link such as `/download/out.zip`.
    pub fn resolve(&self, link: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(link)
            .map_err(|e| ApiError::InvalidUrl(format!("{link}: {e}")))
    }

    // ---- private helpers ----

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let request = match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Ensure the response has a success status code. A failed response
    /// carrying a `{success: false, message}` envelope becomes
    /// [`ApiError::Rejected`]; anything else becomes [`ApiError::Status`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(classify_failure(status.as_u16(), body))
    }
}

/// Map a non-2xx response body to an [`ApiError`].
pub(crate) fn classify_failure(status: u16, body: String) -> ApiError {
    match serde_json::from_str::<Envelope>(&body) {
        Ok(Envelope {
            message: Some(message),
            ..
        }) if !message.is_empty() => ApiError::Rejected(message),
        _ => ApiError::Status { status, body },
    }
}
