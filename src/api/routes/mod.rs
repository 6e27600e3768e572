//! Route handlers for the web server
//!
//! Handlers are organized by domain:
//! - [`mashup`] — the request form and job submission
//! - [`jobs`] — job status
//! - [`system`] — health and events

use serde::Deserialize;

mod jobs;
mod mashup;
mod system;

pub use jobs::*;
pub use mashup::*;
pub use system::*;

/// Form body of `POST /generate`
///
/// Every field is optional at this layer so that a missing field produces the
/// plain-text validation message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateForm {
    /// Search term
    pub singer: Option<String>,
    /// Number of tracks
    pub n: Option<String>,
    /// Seconds per clip
    pub y: Option<String>,
    /// Recipient address
    pub email: Option<String>,
}
