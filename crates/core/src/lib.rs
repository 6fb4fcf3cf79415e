//! Domain model for the cliptrim download-and-trim front end.
//!
//! - [`crop_editor`]: screen/webcam crop regions kept in sync between an
//!   overlay and numeric fields.
//! - [`timecode`] and [`submission`]: trim-point parsing and request
//!   validation.
//! - [`progress`]: backend job status payloads and their display form.

pub mod commands;
pub mod crop_editor;
pub mod error;
pub mod progress;
pub mod submission;
pub mod surface;
pub mod timecode;
pub mod types;
