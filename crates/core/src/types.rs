//! Shared domain types: crop rectangles, region names, the per-session
//! [`CropSet`], and job identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Rectangle
// ---------------------------------------------------------------------------

/// A crop region in source-image pixel coordinates.
///
/// Values are fractional because the overlay reports sub-pixel positions;
/// the numeric fields show [`Rectangle::rounded`] values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A [`Rectangle`] rounded to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Round every component to the nearest integer pixel.
    pub fn rounded(&self) -> PixelRect {
        PixelRect {
            x: self.x.round() as i64,
            y: self.y.round() as i64,
            width: self.width.round() as i64,
            height: self.height.round() as i64,
        }
    }

    /// Width divided by height, or `None` for a degenerate rectangle.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height > 0.0 && self.width > 0.0 {
            Some(self.width / self.height)
        } else {
            None
        }
    }
}

impl From<PixelRect> for Rectangle {
    fn from(p: PixelRect) -> Self {
        Self::new(p.x as f64, p.y as f64, p.width as f64, p.height as f64)
    }
}

// ---------------------------------------------------------------------------
// RegionName
// ---------------------------------------------------------------------------

/// The two named crop targets. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionName {
    Screen,
    Webcam,
}

impl RegionName {
    pub const ALL: [RegionName; 2] = [RegionName::Screen, RegionName::Webcam];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Webcam => "webcam",
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "screen" => Ok(Self::Screen),
            "webcam" => Ok(Self::Webcam),
            other => Err(CoreError::Validation(format!(
                "Unknown crop region: '{other}'. Expected 'screen' or 'webcam'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// CropSet
// ---------------------------------------------------------------------------

/// Saved rectangles for both regions. A region is configured iff its
/// rectangle is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CropSet {
    pub screen: Option<Rectangle>,
    pub webcam: Option<Rectangle>,
}

impl CropSet {
    pub fn get(&self, region: RegionName) -> Option<Rectangle> {
        match region {
            RegionName::Screen => self.screen,
            RegionName::Webcam => self.webcam,
        }
    }

    pub fn set(&mut self, region: RegionName, rect: Rectangle) {
        match region {
            RegionName::Screen => self.screen = Some(rect),
            RegionName::Webcam => self.webcam = Some(rect),
        }
    }

    pub fn is_configured(&self, region: RegionName) -> bool {
        self.get(region).is_some()
    }

    /// `true` when both regions are configured.
    pub fn is_complete(&self) -> bool {
        self.screen.is_some() && self.webcam.is_some()
    }

    /// Convert into the submission payload. Requires both regions.
    pub fn to_crop_data(&self) -> Result<CropData, CoreError> {
        match (self.screen, self.webcam) {
            (Some(screen), Some(webcam)) => Ok(CropData { screen, webcam }),
            _ => Err(CoreError::Validation(
                "Please configure both screen and webcam crop areas".to_string(),
            )),
        }
    }
}

/// The `crop_data` object sent with a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropData {
    pub screen: Rectangle,
    pub webcam: Rectangle,
}

// ---------------------------------------------------------------------------
// ProcessId
// ---------------------------------------------------------------------------

/// Opaque backend job handle. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::Validation(
                "process_id must not be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProcessId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProcessId> for String {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
