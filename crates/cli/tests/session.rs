//! Integration tests for the interactive session.
//!
//! Every scenario here is decided before a request would be sent, so the
//! backend URL points at a closed local port and is never contacted.

use std::path::{Path, PathBuf};

use cliptrim::command::{parse_command, Command};
use cliptrim::frame::ImageFrameSource;
use cliptrim::session::Session;
use cliptrim_client::events::MonitorEvent;
use cliptrim_client::monitor::MonitorOptions;
use cliptrim_client::BackendApi;
use cliptrim_core::types::{ProcessId, RegionName};
use image::{Rgba, RgbaImage};

fn write_frame(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("frame.png");
    let frame = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
    frame.save(&path).expect("frame should be written");
    path
}

fn session(frame: Option<PathBuf>) -> Session {
    let api = BackendApi::new("http://127.0.0.1:9").expect("valid base url");
    let (session, _events) = Session::new(api, ImageFrameSource::new(frame), MonitorOptions::default());
    session
}

async fn run(session: &mut Session, line: &str) -> Vec<String> {
    let command = parse_command(line).expect("command should parse");
    session.dispatch(command).await
}

// ---------------------------------------------------------------------------
// Test: crop editing against a frame file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn both_regions_configured_and_previewed() {
    let dir = tempfile::tempdir().unwrap();
    let frame = write_frame(dir.path(), 1280, 720);
    let mut session = session(Some(frame));

    let lines = run(&mut session, "crop begin screen").await;
    assert_eq!(
        lines,
        vec!["Editing screen: x=0 y=0 width=1024 height=720 (aspect lock on)"]
    );
    let lines = run(&mut session, "crop save").await;
    assert_eq!(lines, vec!["Saved screen crop: x=0 y=0 width=1024 height=720"]);

    let lines = run(&mut session, "crop begin webcam").await;
    assert_eq!(
        lines,
        vec!["Editing webcam: x=1024 y=0 width=256 height=144 (aspect lock on)"]
    );
    run(&mut session, "crop save").await;

    let crops = session.editor().crop_set();
    assert!(crops.is_complete());

    let out = dir.path().join("previews");
    let lines = run(&mut session, &format!("crop preview {}", out.display())).await;
    assert!(lines.contains(&"screen preview: 1024x720".to_string()));
    assert!(lines.contains(&"webcam preview: 256x144".to_string()));
    assert!(out.join("screen.png").exists());
    assert!(out.join("webcam.png").exists());
}

#[tokio::test]
async fn locked_width_edit_recomputes_height() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(Some(write_frame(dir.path(), 1280, 720)));

    run(&mut session, "crop begin screen").await;
    let lines = run(&mut session, "crop field width 512").await;

    assert_eq!(lines, vec!["x=0 y=0 width=512 height=360"]);
}

#[tokio::test]
async fn unlocked_drag_is_clamped_to_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(Some(write_frame(dir.path(), 640, 360)));

    run(&mut session, "crop lock off").await;
    run(&mut session, "crop begin webcam").await;
    let lines = run(&mut session, "crop drag 600 300 200 200").await;

    assert_eq!(lines, vec!["x=600 y=300 width=40 height=60"]);
}

#[tokio::test]
async fn frame_can_be_set_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let frame = write_frame(dir.path(), 320, 240);
    let mut session = session(None);

    let lines = run(&mut session, "crop begin screen").await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: No video frame available"));
    assert!(session.editor().active_region().is_none());

    run(&mut session, &format!("frame {}", frame.display())).await;
    run(&mut session, "crop begin screen").await;
    assert_eq!(session.editor().active_region(), Some(RegionName::Screen));
}

// ---------------------------------------------------------------------------
// Test: recoverable errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn editor_errors_are_reported_inline() {
    let mut session = session(None);

    assert_eq!(
        run(&mut session, "crop save").await,
        vec!["Error: No crop region is being edited"]
    );
    assert_eq!(
        run(&mut session, "crop preview").await,
        vec!["Error: Please configure both screen and webcam crop areas first"]
    );
}

#[tokio::test]
async fn process_without_selection_is_rejected_locally() {
    let mut session = session(None);
    run(&mut session, "start 00:00:10").await;
    run(&mut session, "end 00:01:00").await;

    let lines = run(&mut session, "process intro").await;

    assert_eq!(lines, vec!["Error: Please select a video"]);
    assert_eq!(session.running_jobs(), 0);
}

#[tokio::test]
async fn download_with_bad_url_is_rejected_locally() {
    let mut session = session(None);

    let lines = session
        .dispatch(Command::Download {
            url: "ftp://files.example.com/talk.mp4".into(),
            filename: "talk".into(),
        })
        .await;

    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: Video URL must start with http"));
}

// ---------------------------------------------------------------------------
// Test: form state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn playback_marks_fill_trim_times() {
    let mut session = session(None);

    assert_eq!(run(&mut session, "mark-start 75.9").await, vec!["Start time: 00:01:15"]);
    assert_eq!(run(&mut session, "mark-end 3661").await, vec!["End time: 01:01:01"]);
    assert_eq!(session.form().start_time, "00:01:15");
    assert_eq!(session.form().end_time, "01:01:01");
}

#[tokio::test]
async fn cleanup_asks_for_confirmation() {
    let mut session = session(None);

    let lines = run(&mut session, "cleanup").await;

    assert!(lines.iter().any(|l| l.contains("cleanup confirm")));
}

#[tokio::test]
async fn status_describes_empty_session() {
    let mut session = session(None);

    let lines = run(&mut session, "status").await;

    assert!(lines.contains(&"Video: none selected".to_string()));
    assert!(lines.contains(&"Trim: - -> -".to_string()));
    assert!(lines.contains(&"screen crop: not set".to_string()));
    assert!(lines.contains(&"Aspect lock on".to_string()));
    assert_eq!(run(&mut session, "cancel").await, vec!["No running jobs"]);
}

/// Events for jobs the session is not following are dropped.
#[tokio::test]
async fn events_for_unknown_jobs_are_ignored() {
    let mut session = session(None);

    let lines = session
        .handle_event(MonitorEvent::Failed {
            process_id: ProcessId::new("stale").unwrap(),
            message: "gone".into(),
            observed_at: chrono::Utc::now(),
        })
        .await;

    assert!(lines.is_empty());
}
