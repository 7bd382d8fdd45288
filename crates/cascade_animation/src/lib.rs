// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequenced element animations.
//!
//! This crate chains animation steps into composite animations:
//! - Strictly ordered step playback, timed or instantaneous
//! - Cancel and terminate with different observer semantics
//! - Structural reverse animations
//! - Duration overrides preserving relative pacing
//! - Non-owning, auto-invalidating delegates
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - An opaque step contract ([`AnimationStep`])
//! - A cooperative run loop driving timed playback
//! - A stage of elements animated by [`ViewAnimationStep`]

pub mod animation;
pub mod curve;
pub mod delegate;
pub mod error;
pub mod run_loop;
pub mod settings;
pub mod stage;
pub mod step;
pub mod view_step;

pub use animation::{Animation, Phase, UserInfo, REVERSE_TAG_PREFIX};
pub use curve::AnimationCurve;
pub use delegate::{AnimationDelegate, DelegateHandle, DelegateRef};
pub use error::{AnimationError, Result};
pub use run_loop::{RunLoop, TaskId, Tick};
pub use settings::AnimationSettings;
pub use stage::{Element, ElementId, ElementTransform, Rect, Stage};
pub use step::{AnimationStep, StepCompletion, StepContext};
pub use view_step::{ElementAnimation, ViewAnimationStep, DEFAULT_STEP_DURATION};
