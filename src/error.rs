//! Error types for transformation and image probing.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// TransformError
// ============================================================================

/// Errors surfaced to the caller of a transformation
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("No callback provided")]
    MissingCallback,

    #[error("no tokio runtime available to drive the transformation")]
    NoRuntime,

    #[error("failed to parse HTML: {0}")]
    Parse(String),

    #[error("no configured defaults for `{0}`")]
    MissingTagDefaults(String),

    #[error("failed to build HTTP client")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// ProbeError
// ============================================================================

/// Reasons a remote image could not be measured.
///
/// These never reach the caller of a transformation: the affected element
/// falls back to a plain `img` tag instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("request failed: {0}")]
    Request(String),

    #[error("no activity for {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("unable to read image dimensions")]
    Decode(#[from] image::ImageError),
}
