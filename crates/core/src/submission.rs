//! Client-side validation for download and processing submissions.
//!
//! Every check runs before a request is built; a failure is a
//! [`CoreError::Validation`] carrying the message shown to the user, and
//! no request is sent.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::timecode::{time_to_seconds, validate_time_format};
use crate::types::{CropData, CropSet};

/// Extension the backend stores every video under.
pub const VIDEO_EXTENSION: &str = ".mp4";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").expect("valid regex"));

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Form body for `POST /download-video`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub video_url: String,
    pub filename: String,
}

impl DownloadRequest {
    pub fn new(video_url: &str, filename: &str) -> Result<Self, CoreError> {
        let video_url = video_url.trim();
        let filename = filename.trim();

        if video_url.is_empty() || filename.is_empty() {
            return Err(CoreError::Validation(
                "Please enter both video URL and filename".to_string(),
            ));
        }
        if !video_url.starts_with("http://") && !video_url.starts_with("https://") {
            return Err(CoreError::Validation(format!(
                "Video URL must start with http:// or https://, got: '{video_url}'"
            )));
        }

        Ok(Self {
            video_url: video_url.to_string(),
            filename: filename.to_string(),
        })
    }

    /// The name the backend will store the download under.
    pub fn stored_filename(&self) -> String {
        sanitize_filename(&self.filename)
    }
}

// ---------------------------------------------------------------------------
// Process
// ---------------------------------------------------------------------------

/// Raw inputs of the trim form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessForm {
    pub input_file: String,
    pub start_time: String,
    pub end_time: String,
    pub filename: String,
}

/// JSON body for `POST /process-video`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRequest {
    pub input_file: String,
    pub start_time: String,
    pub end_time: String,
    pub filename: String,
    pub crop_data: CropData,
}

impl ProcessRequest {
    /// Validate the form against the selected video's `duration`
    /// (`HH:MM:SS`) and the editor's crop set.
    ///
    /// Checks run in the order the user fills the form, and the first
    /// failure is reported.
    pub fn new(form: &ProcessForm, duration: &str, crop_set: CropSet) -> Result<Self, CoreError> {
        let input_file = form.input_file.trim();
        let start_time = form.start_time.trim();
        let end_time = form.end_time.trim();
        let filename = form.filename.trim();

        if input_file.is_empty() {
            return Err(invalid("Please select a video"));
        }
        if start_time.is_empty() || end_time.is_empty() {
            return Err(invalid("Please enter both start and end times"));
        }
        if filename.is_empty() {
            return Err(invalid("Please enter a filename for the processed video"));
        }
        if !validate_time_format(start_time) || !validate_time_format(end_time) {
            return Err(invalid("Times must be in HH:MM:SS format"));
        }

        let start = time_to_seconds(start_time)?;
        let end = time_to_seconds(end_time)?;
        let total = time_to_seconds(duration)?;

        if start >= end {
            return Err(invalid("End time must be greater than start time"));
        }
        if start >= total {
            return Err(invalid("Start time cannot be greater than video duration"));
        }
        if end > total {
            return Err(invalid("End time cannot be greater than video duration"));
        }

        let crop_data = crop_set.to_crop_data()?;

        Ok(Self {
            input_file: input_file.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            filename: filename.to_string(),
            crop_data,
        })
    }
}

fn invalid(msg: &str) -> CoreError {
    CoreError::Validation(msg.to_string())
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Normalise a user-supplied filename the way the backend stores it:
/// directory components dropped, characters other than word characters,
/// `-` and `.` replaced with `_`, and `.mp4` appended when missing.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let mut name = UNSAFE_FILENAME_CHARS.replace_all(base, "_").into_owned();
    if !name.to_lowercase().ends_with(VIDEO_EXTENSION) {
        name.push_str(VIDEO_EXTENSION);
    }
    name
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::types::{Rectangle, RegionName};

    fn full_crop_set() -> CropSet {
        let mut set = CropSet::default();
        set.set(RegionName::Screen, Rectangle::new(0.0, 0.0, 1536.0, 1080.0));
        set.set(RegionName::Webcam, Rectangle::new(1536.0, 0.0, 384.0, 216.0));
        set
    }

    fn form(start: &str, end: &str) -> ProcessForm {
        ProcessForm {
            input_file: "lecture.mp4".into(),
            start_time: start.into(),
            end_time: end.into(),
            filename: "intro".into(),
        }
    }

    fn message(result: Result<ProcessRequest, CoreError>) -> String {
        match result {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn download_requires_url_and_filename() {
        assert_matches!(DownloadRequest::new("", "clip"), Err(CoreError::Validation(_)));
        assert_matches!(
            DownloadRequest::new("https://cdn.example.com/v.m3u8", "  "),
            Err(CoreError::Validation(_))
        );
        let req = DownloadRequest::new(" https://cdn.example.com/v.m3u8 ", " talk ").unwrap();
        assert_eq!(req.video_url, "https://cdn.example.com/v.m3u8");
        assert_eq!(req.filename, "talk");
        assert_eq!(req.stored_filename(), "talk.mp4");
    }

    #[test]
    fn download_rejects_non_http_url() {
        assert_matches!(
            DownloadRequest::new("ftp://example.com/v.mp4", "v"),
            Err(CoreError::Validation(msg)) if msg.contains("http")
        );
    }

    #[test]
    fn valid_form_builds_request() {
        let req = ProcessRequest::new(&form("00:00:10", "00:01:00"), "00:02:00", full_crop_set())
            .unwrap();
        assert_eq!(req.start_time, "00:00:10");
        assert_eq!(req.crop_data.webcam.width, 384.0);

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["input_file"], "lecture.mp4");
        assert_eq!(body["crop_data"]["screen"]["height"], 1080.0);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let msg = message(ProcessRequest::new(
            &form("00:01:00", "00:00:30"),
            "00:02:00",
            full_crop_set(),
        ));
        assert_eq!(msg, "End time must be greater than start time");
    }

    #[test]
    fn equal_times_are_rejected() {
        let msg = message(ProcessRequest::new(
            &form("00:01:00", "00:01:00"),
            "00:02:00",
            full_crop_set(),
        ));
        assert_eq!(msg, "End time must be greater than start time");
    }

    #[test]
    fn oversized_backend_duration_is_rejected() {
        let msg = message(ProcessRequest::new(
            &form("00:00:10", "00:01:00"),
            "9999999999999999999:00:00",
            full_crop_set(),
        ));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn times_beyond_duration_are_rejected() {
        let msg = message(ProcessRequest::new(
            &form("00:03:00", "00:04:00"),
            "00:02:00",
            full_crop_set(),
        ));
        assert_eq!(msg, "Start time cannot be greater than video duration");

        let msg = message(ProcessRequest::new(
            &form("00:01:00", "00:02:01"),
            "00:02:00",
            full_crop_set(),
        ));
        assert_eq!(msg, "End time cannot be greater than video duration");

        assert!(
            ProcessRequest::new(&form("00:01:00", "00:02:00"), "00:02:00", full_crop_set()).is_ok()
        );
    }

    #[test]
    fn malformed_times_are_rejected() {
        let msg = message(ProcessRequest::new(
            &form("0:1:0", "00:02:00"),
            "00:05:00",
            full_crop_set(),
        ));
        assert_eq!(msg, "Times must be in HH:MM:SS format");
    }

    #[test]
    fn missing_inputs_are_reported_in_form_order() {
        let mut f = form("", "");
        f.input_file.clear();
        assert_eq!(
            message(ProcessRequest::new(&f, "00:02:00", full_crop_set())),
            "Please select a video"
        );

        let f = form("", "00:01:00");
        assert_eq!(
            message(ProcessRequest::new(&f, "00:02:00", full_crop_set())),
            "Please enter both start and end times"
        );

        let mut f = form("00:00:01", "00:01:00");
        f.filename = " ".into();
        assert_eq!(
            message(ProcessRequest::new(&f, "00:02:00", full_crop_set())),
            "Please enter a filename for the processed video"
        );
    }

    #[test]
    fn unconfigured_crops_are_rejected() {
        let msg = message(ProcessRequest::new(
            &form("00:00:10", "00:01:00"),
            "00:02:00",
            CropSet::default(),
        ));
        assert!(msg.contains("crop areas"));
    }

    #[test]
    fn sanitize_filename_matches_backend_rules() {
        assert_eq!(sanitize_filename("my talk"), "my_talk.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd.mp4");
        assert_eq!(sanitize_filename("C:\\videos\\a.MP4"), "a.MP4");
        assert_eq!(sanitize_filename("clip-1_v2.mp4"), "clip-1_v2.mp4");
        assert_eq!(sanitize_filename("what?.mov"), "what_.mov.mp4");
    }
}
