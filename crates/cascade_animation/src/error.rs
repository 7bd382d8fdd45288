// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors reported by animations and their settings.

use thiserror::Error;

/// Animation errors
#[derive(Debug, Error)]
pub enum AnimationError {
    /// Play requested while the animation is already running
    #[error("Animation is already running")]
    AlreadyRunning,

    /// Cancel or terminate requested while the animation is idle
    #[error("Animation is not running")]
    NotRunning,

    /// Cancel or terminate requested while one is already in progress
    #[error("Animation is already being cancelled or terminated")]
    AlreadyStopping,

    /// Duration override with a negative duration
    #[error("Invalid negative duration: {0}")]
    NegativeDuration(f64),

    /// Settings could not be parsed
    #[error("Settings parse error: {0}")]
    Settings(#[from] ron::error::SpannedError),

    /// Settings file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
