//! End-to-end crop editing session driven through typed commands.

use std::cell::RefCell;

use assert_matches::assert_matches;
use cliptrim_core::commands::CropCommand;
use cliptrim_core::crop_editor::{CropEditor, CropField, FrameSource};
use cliptrim_core::error::CoreError;
use cliptrim_core::submission::{ProcessForm, ProcessRequest};
use cliptrim_core::surface::BoundedSurface;
use cliptrim_core::types::{PixelRect, Rectangle, RegionName};
use image::{Rgba, RgbaImage};

/// Frame source returning a queue of prepared frames, repeating the last.
struct ScriptedFrames {
    frames: RefCell<Vec<RgbaImage>>,
}

impl ScriptedFrames {
    fn solid(width: u32, height: u32) -> Self {
        Self {
            frames: RefCell::new(vec![RgbaImage::from_pixel(
                width,
                height,
                Rgba([10, 20, 30, 255]),
            )]),
        }
    }
}

impl FrameSource for ScriptedFrames {
    fn capture(&self) -> Result<RgbaImage, CoreError> {
        let mut frames = self.frames.borrow_mut();
        match frames.len() {
            0 => Err(CoreError::Frame("no video loaded".into())),
            1 => Ok(frames[0].clone()),
            _ => Ok(frames.remove(0)),
        }
    }
}

fn field(field: CropField, value: &str) -> CropCommand {
    CropCommand::FieldChanged {
        field,
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Test: both regions configured through commands feed a valid submission
// ---------------------------------------------------------------------------

#[test]
fn commands_configure_both_regions_for_submission() {
    let mut editor = CropEditor::new(BoundedSurface::new(), ScriptedFrames::solid(1280, 720));

    editor.dispatch(CropCommand::SetAspectLock(false)).unwrap();
    editor.dispatch(CropCommand::BeginEdit(RegionName::Screen)).unwrap();
    editor.dispatch(field(CropField::Width, "1000")).unwrap();
    editor.dispatch(CropCommand::Commit).unwrap();

    editor.dispatch(CropCommand::BeginEdit(RegionName::Webcam)).unwrap();
    editor
        .dispatch(CropCommand::OverlayMoved(Rectangle::new(1000.0, 0.0, 280.0, 160.0)))
        .unwrap();
    editor.dispatch(CropCommand::Commit).unwrap();
    editor.dispatch(CropCommand::PreviewBoth).unwrap();

    let set = editor.crop_set();
    assert_eq!(set.screen, Some(Rectangle::new(0.0, 0.0, 1000.0, 720.0)));
    assert_eq!(set.webcam, Some(Rectangle::new(1000.0, 0.0, 280.0, 160.0)));
    assert_eq!(
        editor.preview(RegionName::Webcam).map(|p| p.dimensions()),
        Some((280, 160))
    );

    let form = ProcessForm {
        input_file: "lecture.mp4".into(),
        start_time: "00:00:05".into(),
        end_time: "00:00:50".into(),
        filename: "lecture-cut".into(),
    };
    let request = ProcessRequest::new(&form, "00:01:00", set).unwrap();
    assert_eq!(request.crop_data.screen.width, 1000.0);
}

// ---------------------------------------------------------------------------
// Test: the lock captured mid-edit drives the other dimension
// ---------------------------------------------------------------------------

#[test]
fn lock_toggled_mid_edit_captures_current_ratio() {
    let mut editor = CropEditor::new(BoundedSurface::new(), ScriptedFrames::solid(1920, 1080));

    editor.dispatch(CropCommand::SetAspectLock(false)).unwrap();
    editor.dispatch(CropCommand::BeginEdit(RegionName::Screen)).unwrap();
    editor
        .dispatch(CropCommand::OverlayMoved(Rectangle::new(10.0, 10.0, 100.0, 50.0)))
        .unwrap();
    editor.dispatch(CropCommand::SetAspectLock(true)).unwrap();
    editor.dispatch(field(CropField::Width, "200")).unwrap();

    assert_eq!(
        editor.fields(),
        PixelRect {
            x: 10,
            y: 10,
            width: 200,
            height: 100
        }
    );
}

// ---------------------------------------------------------------------------
// Test: frame capture failure leaves the editor idle
// ---------------------------------------------------------------------------

#[test]
fn capture_failure_does_not_open_overlay() {
    let frames = ScriptedFrames {
        frames: RefCell::new(Vec::new()),
    };
    let mut editor = CropEditor::new(BoundedSurface::new(), frames);

    assert_matches!(
        editor.dispatch(CropCommand::BeginEdit(RegionName::Webcam)),
        Err(CoreError::Frame(_))
    );
    assert!(editor.active_region().is_none());
    assert!(!editor.surface().is_open());
}

// ---------------------------------------------------------------------------
// Test: previewing before both regions exist is a recoverable error
// ---------------------------------------------------------------------------

#[test]
fn preview_before_configuration_is_recoverable() {
    let mut editor = CropEditor::new(BoundedSurface::new(), ScriptedFrames::solid(640, 360));

    assert_matches!(
        editor.dispatch(CropCommand::PreviewBoth),
        Err(CoreError::Configuration(_))
    );

    for region in RegionName::ALL {
        editor.dispatch(CropCommand::BeginEdit(region)).unwrap();
        editor.dispatch(CropCommand::Commit).unwrap();
    }
    assert!(editor.dispatch(CropCommand::PreviewBoth).is_ok());
}
