//! Typed commands produced by user actions.
//!
//! Front ends translate their input events into these values and hand
//! them to [`CropEditor::dispatch`](crate::crop_editor::CropEditor::dispatch),
//! which keeps the editor testable without any rendering surface.

use crate::crop_editor::CropField;
use crate::types::{Rectangle, RegionName};

#[derive(Debug, Clone, PartialEq)]
pub enum CropCommand {
    /// Open the overlay for a region.
    BeginEdit(RegionName),
    /// The pointer moved or resized the overlay rectangle.
    OverlayMoved(Rectangle),
    /// A numeric field was edited. `value` is the raw text.
    FieldChanged { field: CropField, value: String },
    SetAspectLock(bool),
    /// Save the active region and close the overlay.
    Commit,
    /// Close the overlay without saving.
    Cancel,
    /// Refresh both region previews from the live frame.
    PreviewBoth,
}
