//! Error types for the export pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in a single pipeline stage
#[derive(Error, Debug)]
pub enum Error {
    /// Rasterization failed or the target element was not found
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Page geometry cannot hold any content
    #[error("Invalid page geometry: {0}")]
    SliceGeometryError(String),

    /// A page image could not be encoded or the document could not be written
    #[error("PDF assembly failed: {0}")]
    AssemblyError(String),

    /// The finished document could not be handed to its destination
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The export worker thread is gone or dropped a reply
    #[error("Export worker unavailable: {0}")]
    WorkerError(String),

    /// Quotation API request failed
    #[cfg(feature = "api")]
    #[error("API error: {0}")]
    ApiError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CaptureError(err.to_string())
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::AssemblyError(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::AssemblyError(err.to_string())
    }
}

/// Pipeline stage an [`ExportError`] originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Slice,
    Assemble,
    Deliver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Capture => "capture",
            Stage::Slice => "slice",
            Stage::Assemble => "assemble",
            Stage::Deliver => "deliver",
        };
        f.write_str(name)
    }
}

/// The single failure type returned by the export controller.
///
/// Wraps the originating stage error unchanged in kind and adds the stage it
/// came from.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct ExportError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl ExportError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match (&self.source, self.stage) {
            (Error::CaptureError(_), _) | (_, Stage::Capture) => "could not render document",
            (Error::SliceGeometryError(_), _) | (Error::ConfigError(_), _) => "invalid page layout",
            (Error::DeliveryError(_), _) | (_, Stage::Deliver) => "could not save file",
            _ => "could not produce file",
        }
    }
}

/// Attach a stage to a stage-level result
pub(crate) trait StageContext<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, ExportError>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, stage: Stage) -> std::result::Result<T, ExportError> {
        self.map_err(|source| ExportError::new(stage, source))
    }
}
