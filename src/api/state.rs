//! Application state for the web server

use crate::jobs::JobRunner;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; the runner is a bundle of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Background job runner
    pub runner: JobRunner,
}

impl AppState {
    /// Create a new AppState
    pub fn new(runner: JobRunner) -> Self {
        Self { runner }
    }
}
