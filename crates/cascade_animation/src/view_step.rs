// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step animating elements of a [`Stage`].
//!
//! Each registered element gets a transform delta and an opacity delta. When
//! the animation resizes views, translation and scale are applied to the
//! element frame instead of its transform.

use crate::curve::AnimationCurve;
use crate::run_loop::{RunLoop, TaskId, Tick};
use crate::stage::{Element, ElementId, ElementTransform, Stage};
use crate::step::{AnimationStep, StepCompletion, StepContext};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Default step duration in seconds
pub const DEFAULT_STEP_DURATION: f64 = 0.2;

/// Changes applied to one element during a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ElementAnimation {
    /// Transform delta
    pub transform: ElementTransform,
    /// Opacity delta
    pub alpha_variation: f32,
}

impl ElementAnimation {
    /// No change
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transform delta
    pub fn with_transform(mut self, transform: ElementTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the opacity delta
    pub fn with_alpha_variation(mut self, alpha_variation: f32) -> Self {
        self.alpha_variation = alpha_variation;
        self
    }

    /// Changes undoing this one
    pub fn reversed(&self) -> Self {
        Self {
            transform: self.transform.inverse(),
            alpha_variation: -self.alpha_variation,
        }
    }
}

/// Playback state of a started step
#[derive(Debug)]
struct ActiveRun {
    ticker: TaskId,
    starts: Vec<(ElementId, Element)>,
    resize_views: bool,
    completion: Option<StepCompletion>,
}

/// Step changing the transform, frame and opacity of stage elements
#[derive(Debug)]
pub struct ViewAnimationStep {
    stage: Stage,
    animations: IndexMap<ElementId, ElementAnimation>,
    duration: f64,
    curve: AnimationCurve,
    tag: Option<String>,
    run: Rc<RefCell<Option<ActiveRun>>>,
}

impl ViewAnimationStep {
    /// Create an empty step on `stage`
    pub fn new(stage: &Stage) -> Self {
        Self {
            stage: stage.clone(),
            animations: IndexMap::new(),
            duration: DEFAULT_STEP_DURATION,
            curve: AnimationCurve::default(),
            tag: None,
            run: Rc::new(RefCell::new(None)),
        }
    }

    /// Register an element. Registering it again replaces its changes but
    /// keeps its original registration position.
    pub fn add_element_animation(&mut self, element: ElementId, animation: ElementAnimation) {
        self.animations.insert(element, animation);
    }

    /// Builder form of [`Self::add_element_animation`]
    pub fn with_element(mut self, element: ElementId, animation: ElementAnimation) -> Self {
        self.add_element_animation(element, animation);
        self
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.set_duration(duration);
        self
    }

    /// Set the timing curve
    pub fn with_curve(mut self, curve: AnimationCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Set the tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Timing curve
    pub fn curve(&self) -> AnimationCurve {
        self.curve
    }

    /// Changes registered for an element
    pub fn element_animation(&self, element: ElementId) -> Option<&ElementAnimation> {
        self.animations.get(&element)
    }

    /// Whether the step is currently playing
    pub fn is_playing(&self) -> bool {
        self.run.borrow().is_some()
    }

    fn copy_with(&self, animations: IndexMap<ElementId, ElementAnimation>, curve: AnimationCurve) -> Self {
        Self {
            stage: self.stage.clone(),
            animations,
            duration: self.duration,
            curve,
            tag: self.tag.clone(),
            run: Rc::new(RefCell::new(None)),
        }
    }

    fn prepare(&self, ctx: &StepContext) -> Vec<(ElementId, Element)> {
        if ctx.bring_to_front {
            for element in self.animations.keys() {
                self.stage.bring_to_front(*element);
            }
        }

        if ctx.resize_views {
            for (element, animation) in &self.animations {
                if animation.transform.has_rotation() {
                    tracing::warn!(
                        "Rotation on element {:?} ignored: only translation and scale apply when resizing views",
                        element.0
                    );
                }
            }
        }

        self.animations
            .keys()
            .filter_map(|element| match self.stage.element(*element) {
                Some(state) => Some((*element, state)),
                None => {
                    tracing::debug!("Element {:?} is not on the stage, skipping", element.0);
                    None
                }
            })
            .collect()
    }

    fn start_ticker(&self, run_loop: &RunLoop) -> TaskId {
        let run = self.run.clone();
        let stage = self.stage.clone();
        let animations = self.animations.clone();
        let curve = self.curve;
        let duration = self.duration;
        let start_time = run_loop.now();

        run_loop.add_ticker(move |now| {
            let progress = ((now - start_time) / duration).min(1.0) as f32;
            let finished = progress >= 1.0;
            let fraction = if finished { 1.0 } else { curve.apply(progress) };

            {
                let run = run.borrow();
                let Some(active) = run.as_ref() else {
                    return Tick::Finished;
                };
                apply_fraction(&stage, &animations, &active.starts, fraction, active.resize_views);
            }

            if !finished {
                return Tick::Continue;
            }

            let completion = run.borrow_mut().take().and_then(|active| active.completion);
            if let Some(completion) = completion {
                completion.complete();
            }
            Tick::Finished
        })
    }
}

/// Set every element to `fraction` of the way from its start state to its end state
fn apply_fraction(
    stage: &Stage,
    animations: &IndexMap<ElementId, ElementAnimation>,
    starts: &[(ElementId, Element)],
    fraction: f32,
    resize_views: bool,
) {
    for (element, start) in starts {
        let Some(animation) = animations.get(element) else {
            continue;
        };
        stage.update(*element, |state| {
            state.alpha = start.alpha + animation.alpha_variation * fraction;
            if resize_views {
                let end = start
                    .frame
                    .scaled_and_translated(animation.transform.scale, animation.transform.translation);
                state.frame = if fraction >= 1.0 { end } else { start.frame.lerp(&end, fraction) };
            } else if fraction >= 1.0 {
                state.transform = start.transform.then(&animation.transform);
            } else {
                state.transform = start.transform.then(&animation.transform.interpolate(fraction));
            }
        });
    }
}

impl AnimationStep for ViewAnimationStep {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    fn play(&self, ctx: &StepContext, animated: bool, completion: StepCompletion) {
        if let Some(previous) = self.run.borrow_mut().take() {
            ctx.run_loop.cancel(previous.ticker);
        }

        let starts = self.prepare(ctx);

        if !animated || self.duration <= 0.0 {
            apply_fraction(&self.stage, &self.animations, &starts, 1.0, ctx.resize_views);
            completion.complete();
            return;
        }

        let ticker = self.start_ticker(&ctx.run_loop);
        *self.run.borrow_mut() = Some(ActiveRun {
            ticker,
            starts,
            resize_views: ctx.resize_views,
            completion: Some(completion),
        });
    }

    fn force_to_end_state(&self, ctx: &StepContext) {
        let active = self.run.borrow_mut().take();
        match active {
            Some(active) => {
                ctx.run_loop.cancel(active.ticker);
                apply_fraction(&self.stage, &self.animations, &active.starts, 1.0, active.resize_views);
            }
            None => {
                let starts = self.prepare(ctx);
                apply_fraction(&self.stage, &self.animations, &starts, 1.0, ctx.resize_views);
            }
        }
    }

    fn reversed(&self) -> Box<dyn AnimationStep> {
        let animations = self
            .animations
            .iter()
            .map(|(element, animation)| (*element, animation.reversed()))
            .collect();
        Box::new(self.copy_with(animations, self.curve.reversed()))
    }

    fn boxed_clone(&self) -> Box<dyn AnimationStep> {
        Box::new(self.copy_with(self.animations.clone(), self.curve))
    }

    fn elements(&self) -> Vec<ElementId> {
        self.animations.keys().copied().collect()
    }

    fn alpha_variation(&self, element: ElementId) -> f32 {
        self.animations
            .get(&element)
            .map(|animation| animation.alpha_variation)
            .unwrap_or(0.0)
    }
}
