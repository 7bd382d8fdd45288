// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation step contract.
//!
//! A step is one phase of an animation: a bundle of element changes played
//! over a bounded duration. The sequencer treats steps as black boxes and only
//! relies on the operations of [`AnimationStep`].

use crate::run_loop::RunLoop;
use crate::stage::ElementId;
use std::fmt;

/// Everything a step needs from the animation playing it
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Loop driving timed playback
    pub run_loop: RunLoop,
    /// Alter element frames instead of shape-only transforms
    pub resize_views: bool,
    /// Raise the step's elements above their siblings when it starts
    pub bring_to_front: bool,
}

impl StepContext {
    /// Context with all flags off
    pub fn new(run_loop: RunLoop) -> Self {
        Self {
            run_loop,
            resize_views: false,
            bring_to_front: false,
        }
    }
}

/// Single-use completion token handed to [`AnimationStep::play`]
///
/// The step consumes it once it reaches its end state naturally. Dropping it
/// without calling [`StepCompletion::complete`] means the step never reports
/// completion, which is what a forced step does.
pub struct StepCompletion {
    callback: Box<dyn FnOnce()>,
}

impl StepCompletion {
    /// Wrap a completion callback
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A completion that does nothing when called
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Report that the step has reached its end state
    pub fn complete(self) {
        (self.callback)();
    }
}

impl fmt::Debug for StepCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCompletion").finish_non_exhaustive()
    }
}

/// One independently playable and reversible phase of an animation
pub trait AnimationStep: fmt::Debug {
    /// Duration in seconds
    fn duration(&self) -> f64;

    /// Override the duration. Negative values are clamped to zero.
    fn set_duration(&mut self, duration: f64);

    /// Optional identifying tag
    fn tag(&self) -> Option<&str>;

    /// Replace the tag
    fn set_tag(&mut self, tag: Option<String>);

    /// Start the step. `completion` must be consumed exactly once when the end
    /// state is reached; non-animated and zero-duration plays may consume it
    /// before returning.
    fn play(&self, ctx: &StepContext, animated: bool, completion: StepCompletion);

    /// Jump straight to the end state, whether or not the step was started.
    /// Must not consume a pending completion.
    fn force_to_end_state(&self, ctx: &StepContext);

    /// Independent copy playing the inverse changes
    fn reversed(&self) -> Box<dyn AnimationStep>;

    /// Independent copy of this step
    fn boxed_clone(&self) -> Box<dyn AnimationStep>;

    /// Elements touched by this step, in registration order
    fn elements(&self) -> Vec<ElementId>;

    /// Opacity change applied to `element`, 0 if it is not involved
    fn alpha_variation(&self, element: ElementId) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_completion_runs_callback_once() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let completion = StepCompletion::new(move || counter.set(counter.get() + 1));
        completion.complete();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_dropped_completion_never_fires() {
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        drop(StepCompletion::new(move || flag.set(true)));
        assert!(!fired.get());
    }
}
