//! Crop editor state model.
//!
//! [`CropEditor`] owns the session's [`CropSet`] and aspect lock, and keeps
//! the active rectangle consistent between an interactive overlay
//! ([`CropSurface`]) and four integer fields. Frames come from a
//! [`FrameSource`]: once as a still reference when an edit begins, and
//! again live whenever a preview is regenerated.
//!
//! Nothing here suspends; every operation completes synchronously.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use image::RgbaImage;

use crate::commands::CropCommand;
use crate::error::CoreError;
use crate::types::{CropSet, PixelRect, Rectangle, RegionName};

/// Share of the frame width given to the default screen region.
pub const SCREEN_DEFAULT_WIDTH_FRACTION: f64 = 0.8;

/// Share of each frame dimension given to the default webcam region.
pub const WEBCAM_DEFAULT_FRACTION: f64 = 0.2;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Supplies the current video frame at its native pixel size.
pub trait FrameSource {
    fn capture(&self) -> Result<RgbaImage, CoreError>;
}

/// The interactive rectangle overlay.
///
/// Implementations own clamping: the editor stores whatever rectangle the
/// surface reports.
pub trait CropSurface {
    /// Show the overlay over an image of the given size.
    fn open(
        &mut self,
        image_width: u32,
        image_height: u32,
        initial: Rectangle,
        aspect_ratio: Option<f64>,
    );

    /// The rectangle currently shown.
    fn data(&self) -> Rectangle;

    /// Move/resize the overlay. Returns the rectangle actually applied.
    fn set_data(&mut self, rect: Rectangle) -> Rectangle;

    fn set_aspect_ratio(&mut self, ratio: Option<f64>);

    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// One of the four numeric inputs next to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropField {
    X,
    Y,
    Width,
    Height,
}

impl CropField {
    pub fn is_dimension(&self) -> bool {
        matches!(self, Self::Width | Self::Height)
    }
}

impl fmt::Display for CropField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Width => "width",
            Self::Height => "height",
        })
    }
}

impl FromStr for CropField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.strip_prefix("crop-").unwrap_or(&name) {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "width" | "w" => Ok(Self::Width),
            "height" | "h" => Ok(Self::Height),
            _ => Err(CoreError::Validation(format!(
                "Unknown crop field: '{s}'. Expected x, y, width or height"
            ))),
        }
    }
}

/// Parse a field value the way a browser number input does with
/// `parseInt`: optional leading whitespace and sign, then the longest run
/// of digits. Anything unparseable is 0.
pub fn parse_field_value(value: &str) -> i64 {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Starting rectangle for a region that has never been saved.
///
/// Screen takes the left 80% of the frame at full height; webcam takes a
/// 20% x 20% box in the top-right corner.
pub fn default_rectangle(region: RegionName, image_width: u32, image_height: u32) -> Rectangle {
    let (w, h) = (image_width as f64, image_height as f64);
    match region {
        RegionName::Screen => Rectangle::new(0.0, 0.0, w * SCREEN_DEFAULT_WIDTH_FRACTION, h),
        RegionName::Webcam => {
            let cam_w = w * WEBCAM_DEFAULT_FRACTION;
            let cam_h = h * WEBCAM_DEFAULT_FRACTION;
            Rectangle::new(w - cam_w, 0.0, cam_w, cam_h)
        }
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// State that only exists while a region is being edited.
struct ActiveEdit {
    region: RegionName,
    reference: RgbaImage,
    /// Width / height captured when the lock was engaged.
    locked_ratio: Option<f64>,
}

pub struct CropEditor<S, F> {
    surface: S,
    frames: F,
    crop_set: CropSet,
    aspect_lock: bool,
    fields: PixelRect,
    active: Option<ActiveEdit>,
    previews: HashMap<RegionName, RgbaImage>,
}

impl<S: CropSurface, F: FrameSource> CropEditor<S, F> {
    /// Create the editor for a session. The aspect lock starts engaged.
    pub fn new(surface: S, frames: F) -> Self {
        Self {
            surface,
            frames,
            crop_set: CropSet::default(),
            aspect_lock: true,
            fields: PixelRect::default(),
            active: None,
            previews: HashMap::new(),
        }
    }

    /// Start editing `region` over a fresh still of the current frame.
    ///
    /// An edit already in progress for another region is discarded
    /// without saving.
    pub fn begin_edit(&mut self, region: RegionName) -> Result<(), CoreError> {
        let reference = self.frames.capture()?;
        let (width, height) = reference.dimensions();
        if width == 0 || height == 0 {
            return Err(CoreError::Frame(
                "Video frame has no pixel dimensions yet".to_string(),
            ));
        }

        if let Some(previous) = self.active.take() {
            tracing::debug!(region = %previous.region, "Discarding unsaved crop edit");
            self.surface.close();
        }

        let initial = self
            .crop_set
            .get(region)
            .unwrap_or_else(|| default_rectangle(region, width, height));
        let locked_ratio = if self.aspect_lock {
            initial.aspect_ratio()
        } else {
            None
        };

        self.surface.open(width, height, initial, locked_ratio);
        self.fields = self.surface.data().rounded();
        self.active = Some(ActiveEdit {
            region,
            reference,
            locked_ratio,
        });

        tracing::debug!(region = %region, width, height, "Crop edit started");
        Ok(())
    }

    /// The overlay reports a new rectangle after a drag or resize.
    ///
    /// Only the fields change; the overlay already shows `rect`.
    pub fn on_overlay_change(&mut self, rect: Rectangle) -> Result<PixelRect, CoreError> {
        self.require_active()?;
        self.fields = rect.rounded();
        Ok(self.fields)
    }

    /// The user typed into one of the numeric fields.
    pub fn on_field_change(&mut self, field: CropField, value: &str) -> Result<PixelRect, CoreError> {
        let locked_ratio = self.require_active()?.locked_ratio;
        let n = parse_field_value(value) as f64;

        let mut rect = self.surface.data();
        match field {
            CropField::X => rect.x = n,
            CropField::Y => rect.y = n,
            CropField::Width => {
                rect.width = n;
                if let Some(ratio) = locked_ratio {
                    rect.height = (n / ratio).round();
                }
            }
            CropField::Height => {
                rect.height = n;
                if let Some(ratio) = locked_ratio {
                    rect.width = (n * ratio).round();
                }
            }
        }

        let applied = self.surface.set_data(rect);
        self.fields = applied.rounded();
        tracing::debug!(field = %field, value = n, "Crop field changed");
        Ok(self.fields)
    }

    /// Engage or release the aspect lock. Engaging captures the ratio of
    /// the rectangle currently on the overlay.
    pub fn set_aspect_lock(&mut self, locked: bool) {
        self.aspect_lock = locked;
        if let Some(active) = self.active.as_mut() {
            let ratio = if locked {
                self.surface.data().aspect_ratio()
            } else {
                None
            };
            active.locked_ratio = ratio;
            self.surface.set_aspect_ratio(ratio);
        }
    }

    /// Save the overlay's rectangle under the active region and end the edit.
    pub fn commit_active_region(&mut self) -> Result<Rectangle, CoreError> {
        let active = self
            .active
            .take()
            .ok_or_else(|| CoreError::Configuration("No crop region is being edited".to_string()))?;

        let rect = self.surface.data();
        self.crop_set.set(active.region, rect);
        self.surface.close();

        tracing::info!(
            region = %active.region,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "Crop region saved",
        );

        if let Err(e) = self.regenerate_preview(active.region) {
            tracing::warn!(region = %active.region, error = %e, "Failed to refresh crop preview");
        }
        Ok(rect)
    }

    /// Close the overlay without saving.
    pub fn cancel_edit(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(region = %active.region, "Crop edit cancelled");
            self.surface.close();
        }
    }

    /// Snapshot of the saved rectangles.
    pub fn crop_set(&self) -> CropSet {
        self.crop_set
    }

    /// Re-crop `region` from the live frame. No-op for unconfigured regions.
    pub fn regenerate_preview(&mut self, region: RegionName) -> Result<(), CoreError> {
        let Some(rect) = self.crop_set.get(region) else {
            return Ok(());
        };
        let frame = self.frames.capture()?;
        self.previews.insert(region, crop_frame(&frame, rect));
        Ok(())
    }

    /// Refresh both previews. Both regions must be configured.
    pub fn preview_both_regions(&mut self) -> Result<(), CoreError> {
        if !self.crop_set.is_complete() {
            return Err(CoreError::Configuration(
                "Please configure both screen and webcam crop areas first".to_string(),
            ));
        }
        for region in RegionName::ALL {
            self.regenerate_preview(region)?;
        }
        Ok(())
    }

    /// Route a typed command to the matching operation.
    pub fn dispatch(&mut self, command: CropCommand) -> Result<(), CoreError> {
        match command {
            CropCommand::BeginEdit(region) => self.begin_edit(region),
            CropCommand::OverlayMoved(rect) => {
                self.require_active()?;
                let applied = self.surface.set_data(rect);
                self.on_overlay_change(applied).map(|_| ())
            }
            CropCommand::FieldChanged { field, value } => {
                self.on_field_change(field, &value).map(|_| ())
            }
            CropCommand::SetAspectLock(locked) => {
                self.set_aspect_lock(locked);
                Ok(())
            }
            CropCommand::Commit => self.commit_active_region().map(|_| ()),
            CropCommand::Cancel => {
                self.cancel_edit();
                Ok(())
            }
            CropCommand::PreviewBoth => self.preview_both_regions(),
        }
    }

    // ---- accessors ----

    pub fn fields(&self) -> PixelRect {
        self.fields
    }

    pub fn active_region(&self) -> Option<RegionName> {
        self.active.as_ref().map(|a| a.region)
    }

    pub fn aspect_locked(&self) -> bool {
        self.aspect_lock
    }

    /// The still captured when the current edit began.
    pub fn reference_image(&self) -> Option<&RgbaImage> {
        self.active.as_ref().map(|a| &a.reference)
    }

    pub fn preview(&self, region: RegionName) -> Option<&RgbaImage> {
        self.previews.get(&region)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut F {
        &mut self.frames
    }

    // ---- private helpers ----

    fn require_active(&self) -> Result<&ActiveEdit, CoreError> {
        self.active
            .as_ref()
            .ok_or_else(|| CoreError::Configuration("No crop region is being edited".to_string()))
    }
}

/// Cut `rect` out of `frame`, clipped to the frame's bounds.
pub fn crop_frame(frame: &RgbaImage, rect: Rectangle) -> RgbaImage {
    let (fw, fh) = frame.dimensions();
    let px = rect.rounded();
    let x = px.x.clamp(0, fw as i64) as u32;
    let y = px.y.clamp(0, fh as i64) as u32;
    let w = px.width.clamp(0, (fw - x) as i64) as u32;
    let h = px.height.clamp(0, (fh - y) as i64) as u32;
    image::imageops::crop_imm(frame, x, y, w, h).to_image()
}
