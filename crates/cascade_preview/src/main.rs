// SPDX-License-Identifier: MIT OR Apache-2.0
//! `cascade` preview runner.
//!
//! Plays a small choreography on a headless stage and logs every lifecycle
//! event:
//! - Timed playback on a simulated 60 Hz run loop
//! - The generated reverse animation
//! - A re-timed copy played instantaneously
//! - A terminated run
//!
//! An optional RON settings file can be passed as the first argument.

mod choreography;

use cascade_animation::{AnimationError, AnimationSettings};
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Preview errors
#[derive(Debug, Error)]
enum PreviewError {
    /// Settings file could not be loaded
    #[error("Failed to load settings from {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: AnimationError,
    },
}

fn load_settings() -> Result<AnimationSettings, PreviewError> {
    match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AnimationSettings::load(&path).map_err(|source| PreviewError::Settings { path, source }),
        None => Ok(AnimationSettings::default()),
    }
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cascade_preview=info,cascade_animation=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cascade preview v{}", env!("CARGO_PKG_VERSION"));

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    choreography::run(settings);
}
