//! Terminal front end for the download-and-trim backend.
//!
//! Exposes the binary's modules so they can be exercised from integration
//! tests.

pub mod command;
pub mod config;
pub mod frame;
pub mod session;
