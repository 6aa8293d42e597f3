//! Errors that end the host application.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Failures that stop the host before or during its run loop.
///
/// Daemon start failures are not listed here: they are shown on screen and
/// the loop keeps running.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Termination signal handlers could not be registered.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a frame to the output failed.
    #[error("failed to write status frame: {source}")]
    Output {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
