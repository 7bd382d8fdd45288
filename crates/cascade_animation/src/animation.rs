// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation sequencer.
//!
//! An [`Animation`] chains [`AnimationStep`]s: each step starts only after the
//! previous one has finished. Animations can be played with or without timing,
//! cancelled or terminated mid-flight, re-timed and reversed.
//!
//! ## Lifecycle
//!
//! `Idle -> Delaying -> Playing(0) -> .. -> Playing(n - 1) -> Finalizing -> Idle`
//!
//! The animation is no longer running once it reaches `Finalizing`; that phase
//! lasts for the `did_stop` notification, which may play the animation again.
//! Cancel and terminate both jump every remaining step to its end state and
//! finalize immediately. A cancelled animation sends no further events; a
//! terminated one still reports the remaining steps and its stop, with
//! `animated == false`.
//!
//! ## Ownership
//!
//! [`Animation`] is a cheap handle; clones refer to the same animation. Steps
//! and timers only hold weak references to it, so dropping the last handle of
//! a running animation silently abandons it: pending completions become
//! no-ops and no further events are sent, while its delay timer and
//! interaction lock are released. Keep a handle for as long as the events
//! matter.

use crate::delegate::{AnimationDelegate, DelegateHandle, DelegateRef};
use crate::error::{AnimationError, Result};
use crate::run_loop::{RunLoop, TaskId};
use crate::settings::AnimationSettings;
use crate::stage::ElementId;
use crate::step::{AnimationStep, StepCompletion, StepContext};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::{Rc, Weak};

/// Prefix added to tags by [`Animation::reverse_animation`]
pub const REVERSE_TAG_PREFIX: &str = "reverse_";

/// Free-form payload carried by an animation
pub type UserInfo = IndexMap<String, serde_json::Value>;

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not running
    #[default]
    Idle,
    /// Waiting for the initial delay to elapse
    Delaying,
    /// Running the step at `index`
    Playing {
        /// Step position
        index: usize,
        /// Whether that step has already reported completion
        finished: bool,
    },
    /// Stopped and reporting `did_stop`; becomes `Idle` unless played again
    Finalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StopMode {
    #[default]
    Normal,
    Cancelling,
    Terminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    Cancelled,
    Terminated,
}

#[derive(Debug, Clone, Default)]
struct Attributes {
    tag: Option<String>,
    user_info: UserInfo,
    settings: AnimationSettings,
}

#[derive(Debug)]
struct Playback {
    phase: Phase,
    mode: StopMode,
    animated: bool,
    /// Bumped on every play; completions from older runs are ignored
    generation: u64,
    will_start_sent: bool,
    /// A step's `play` is on the stack
    dispatching: bool,
    completed_during_dispatch: bool,
    delay_task: Option<TaskId>,
    holds_interaction_lock: bool,
    context: StepContext,
}

impl Playback {
    fn new(run_loop: &RunLoop) -> Self {
        Self {
            phase: Phase::Idle,
            mode: StopMode::Normal,
            animated: false,
            generation: 0,
            will_start_sent: false,
            dispatching: false,
            completed_during_dispatch: false,
            delay_task: None,
            holds_interaction_lock: false,
            context: StepContext::new(run_loop.clone()),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Delaying | Phase::Playing { .. })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.mode == StopMode::Normal && self.is_active()
    }

    /// Steps not yet finished, given the current phase
    fn pending_steps(&self, step_count: usize) -> Range<usize> {
        match self.phase {
            Phase::Delaying => 0..step_count,
            Phase::Playing { index, finished: false } => index..step_count,
            Phase::Playing { index, finished: true } => (index + 1).min(step_count)..step_count,
            Phase::Idle | Phase::Finalizing => step_count..step_count,
        }
    }
}

struct AnimationInner {
    steps: Vec<Rc<dyn AnimationStep>>,
    run_loop: RunLoop,
    attributes: RefCell<Attributes>,
    playback: RefCell<Playback>,
    delegate: RefCell<DelegateHandle>,
}

/// A sequence of animation steps played one after another
#[derive(Clone)]
pub struct Animation {
    inner: Rc<AnimationInner>,
}

impl Animation {
    /// Create an animation from ordered steps. An empty list is valid and
    /// still reports start and stop when played.
    pub fn new(steps: Vec<Box<dyn AnimationStep>>, run_loop: &RunLoop) -> Self {
        let steps: Vec<Rc<dyn AnimationStep>> = steps.into_iter().map(Rc::from).collect();
        Self {
            inner: Rc::new(AnimationInner {
                steps,
                run_loop: run_loop.clone(),
                attributes: RefCell::new(Attributes::default()),
                playback: RefCell::new(Playback::new(run_loop)),
                delegate: RefCell::new(DelegateHandle::unset()),
            }),
        }
    }

    /// Create an animation from steps of a single type
    pub fn from_steps<S: AnimationStep + 'static>(
        steps: impl IntoIterator<Item = S>,
        run_loop: &RunLoop,
    ) -> Self {
        let steps = steps
            .into_iter()
            .map(|step| Box::new(step) as Box<dyn AnimationStep>)
            .collect();
        Self::new(steps, run_loop)
    }

    /// Create an animation made of a single step
    pub fn with_step(step: impl AnimationStep + 'static, run_loop: &RunLoop) -> Self {
        Self::new(vec![Box::new(step)], run_loop)
    }

    /// Create an animation without steps
    pub fn empty(run_loop: &RunLoop) -> Self {
        Self::new(Vec::new(), run_loop)
    }

    /// Whether both handles refer to the same animation
    pub fn ptr_eq(&self, other: &Animation) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Steps, in play order
    pub fn steps(&self) -> &[Rc<dyn AnimationStep>] {
        &self.inner.steps
    }

    /// Number of steps
    pub fn step_count(&self) -> usize {
        self.inner.steps.len()
    }

    /// Run loop driving timed playback
    pub fn run_loop(&self) -> &RunLoop {
        &self.inner.run_loop
    }

    // ----------------------------------------------------------------------
    // Attributes
    // ----------------------------------------------------------------------

    /// Identifying tag
    pub fn tag(&self) -> Option<String> {
        self.inner.attributes.borrow().tag.clone()
    }

    /// Set or clear the tag
    pub fn set_tag(&self, tag: Option<String>) {
        self.inner.attributes.borrow_mut().tag = tag;
    }

    /// Caller payload
    pub fn user_info(&self) -> UserInfo {
        self.inner.attributes.borrow().user_info.clone()
    }

    /// Replace the caller payload
    pub fn set_user_info(&self, user_info: UserInfo) {
        self.inner.attributes.borrow_mut().user_info = user_info;
    }

    /// Current playback settings
    pub fn settings(&self) -> AnimationSettings {
        self.inner.attributes.borrow().settings
    }

    /// Replace all playback settings. Applies to the next play.
    pub fn apply_settings(&self, settings: AnimationSettings) {
        self.inner.attributes.borrow_mut().settings = settings.sanitized();
    }

    /// Whether steps alter element frames
    pub fn resize_views(&self) -> bool {
        self.settings().resize_views
    }

    /// Let steps alter element frames instead of shape-only transforms
    pub fn set_resize_views(&self, resize_views: bool) {
        self.inner.attributes.borrow_mut().settings.resize_views = resize_views;
    }

    /// Whether host interaction is blocked while running
    pub fn locking_ui(&self) -> bool {
        self.settings().locking_ui
    }

    /// Block host interaction while running
    pub fn set_locking_ui(&self, locking_ui: bool) {
        self.inner.attributes.borrow_mut().settings.locking_ui = locking_ui;
    }

    /// Whether animated elements are raised above their siblings
    pub fn bring_to_front(&self) -> bool {
        self.settings().bring_to_front
    }

    /// Raise animated elements above their siblings (never restored)
    pub fn set_bring_to_front(&self, bring_to_front: bool) {
        self.inner.attributes.borrow_mut().settings.bring_to_front = bring_to_front;
    }

    /// Initial delay in seconds
    pub fn delay(&self) -> f64 {
        self.settings().delay
    }

    /// Set the initial delay. Negative values are clamped to zero.
    pub fn set_delay(&self, delay: f64) {
        self.inner.attributes.borrow_mut().settings.delay = delay.max(0.0);
    }

    /// Observe this animation without keeping `delegate` alive
    pub fn set_delegate<D: AnimationDelegate + 'static>(&self, delegate: &Rc<D>) {
        *self.inner.delegate.borrow_mut() = DelegateHandle::new(delegate);
    }

    /// Replace the delegate handle
    pub fn set_delegate_handle(&self, handle: DelegateHandle) {
        *self.inner.delegate.borrow_mut() = handle;
    }

    /// Stop observing
    pub fn clear_delegate(&self) {
        *self.inner.delegate.borrow_mut() = DelegateHandle::unset();
    }

    /// Current delegate handle
    pub fn delegate(&self) -> DelegateHandle {
        self.inner.delegate.borrow().clone()
    }

    // ----------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------

    /// Total duration of all steps, excluding the initial delay
    pub fn duration(&self) -> f64 {
        self.inner.steps.iter().map(|step| step.duration()).sum()
    }

    /// Total opacity change applied to `element` across all steps
    pub fn alpha_variation_for_element(&self, element: ElementId) -> f32 {
        self.inner
            .steps
            .iter()
            .map(|step| step.alpha_variation(element))
            .sum()
    }

    /// Lifecycle phase
    pub fn phase(&self) -> Phase {
        self.inner.playback.borrow().phase
    }

    /// Position of the step currently playing
    pub fn cursor(&self) -> Option<usize> {
        match self.phase() {
            Phase::Playing { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Whether the animation is running, including its delay and while it is
    /// being cancelled or terminated
    pub fn is_running(&self) -> bool {
        self.inner.playback.borrow().is_active()
    }

    /// Whether the animation is being cancelled
    pub fn is_cancelling(&self) -> bool {
        self.inner.playback.borrow().mode == StopMode::Cancelling
    }

    /// Whether the animation is being terminated
    pub fn is_terminating(&self) -> bool {
        self.inner.playback.borrow().mode == StopMode::Terminating
    }

    /// Mode of the current or most recent play
    pub fn is_animated(&self) -> bool {
        self.inner.playback.borrow().animated
    }

    // ----------------------------------------------------------------------
    // Playback
    // ----------------------------------------------------------------------

    /// Play the animation. Non-animated plays reach the end state before
    /// returning. Ignored (and logged) if already running.
    pub fn play(&self, animated: bool) {
        if let Err(e) = self.try_play(animated) {
            tracing::warn!("Play ignored: {e}");
        }
    }

    /// Play with timing after `delay` seconds (negative delays count as zero)
    pub fn play_after_delay(&self, delay: f64) {
        self.set_delay(delay);
        self.play(true);
    }

    /// Like [`Self::play`], reporting why the call was ignored
    pub fn try_play(&self, animated: bool) -> Result<()> {
        let (generation, delay, lock) = {
            let mut playback = self.inner.playback.borrow_mut();
            if playback.is_active() {
                return Err(AnimationError::AlreadyRunning);
            }
            let attributes = self.inner.attributes.borrow();
            playback.generation += 1;
            playback.phase = Phase::Delaying;
            playback.mode = StopMode::Normal;
            playback.animated = animated;
            playback.will_start_sent = false;
            playback.holds_interaction_lock = attributes.settings.locking_ui;
            playback.context = StepContext {
                run_loop: self.inner.run_loop.clone(),
                resize_views: attributes.settings.resize_views,
                bring_to_front: attributes.settings.bring_to_front,
            };
            (playback.generation, attributes.settings.delay, attributes.settings.locking_ui)
        };

        tracing::debug!(
            tag = ?self.tag(),
            steps = self.step_count(),
            animated,
            delay,
            "Animation play"
        );

        // Only a delegate lost during this run cancels it
        let lost = self.inner.delegate.borrow().is_gone();
        if lost {
            tracing::debug!(tag = ?self.tag(), "Forgetting delegate dropped before play");
            self.clear_delegate();
        }

        if lock {
            self.inner.run_loop.lock_interaction();
        }

        if animated && delay > 0.0 {
            let weak = Rc::downgrade(&self.inner);
            let task = self.inner.run_loop.schedule_after(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    Animation { inner }.begin(generation);
                }
            });
            self.inner.playback.borrow_mut().delay_task = Some(task);
        } else {
            self.begin(generation);
        }
        Ok(())
    }

    /// Cancel the animation: every remaining step jumps to its end state and
    /// no further events are sent. Ignored (and logged) if not running.
    pub fn cancel(&self) {
        if let Err(e) = self.try_cancel() {
            tracing::warn!("Cancel ignored: {e}");
        }
    }

    /// Like [`Self::cancel`], reporting why the call was ignored
    pub fn try_cancel(&self) -> Result<()> {
        let (pending, context) = self.begin_stop(StopMode::Cancelling)?;
        tracing::debug!(tag = ?self.tag(), "Animation cancelled");

        for index in pending {
            self.inner.steps[index].force_to_end_state(&context);
        }

        self.finalize(Outcome::Cancelled);
        Ok(())
    }

    /// Terminate the animation: every remaining step jumps to its end state
    /// and the remaining events are sent with `animated == false`. Ignored
    /// (and logged) if not running.
    pub fn terminate(&self) {
        if let Err(e) = self.try_terminate() {
            tracing::warn!("Terminate ignored: {e}");
        }
    }

    /// Like [`Self::terminate`], reporting why the call was ignored
    pub fn try_terminate(&self) -> Result<()> {
        let (pending, context) = self.begin_stop(StopMode::Terminating)?;
        tracing::debug!(tag = ?self.tag(), "Animation terminated");

        let send_will_start = !std::mem::replace(
            &mut self.inner.playback.borrow_mut().will_start_sent,
            true,
        );
        if send_will_start {
            self.notify(|delegate| delegate.animation_will_start(self, false));
        }

        for index in pending {
            self.inner.playback.borrow_mut().phase = Phase::Playing {
                index,
                finished: false,
            };
            let step = self.inner.steps[index].clone();
            step.force_to_end_state(&context);
            self.inner.playback.borrow_mut().phase = Phase::Playing {
                index,
                finished: true,
            };
            self.notify(|delegate| delegate.animation_step_finished(step.as_ref(), false));
        }

        self.finalize(Outcome::Terminated);
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Derived animations
    // ----------------------------------------------------------------------

    /// Copy whose total duration is `duration`, keeping the relative pacing
    /// of the steps. Returns `None` for negative durations.
    pub fn with_duration(&self, duration: f64) -> Option<Animation> {
        match self.try_with_duration(duration) {
            Ok(animation) => Some(animation),
            Err(e) => {
                tracing::warn!("Duration override rejected: {e}");
                None
            }
        }
    }

    /// Like [`Self::with_duration`], reporting why no copy was made
    pub fn try_with_duration(&self, duration: f64) -> Result<Animation> {
        if duration < 0.0 || duration.is_nan() {
            return Err(AnimationError::NegativeDuration(duration));
        }

        // An all-zero animation has no pacing to scale
        let total = self.duration();
        let factor = (total > 0.0).then_some(duration / total);

        let steps = self
            .inner
            .steps
            .iter()
            .map(|step| {
                let mut copy = step.boxed_clone();
                if let Some(factor) = factor {
                    copy.set_duration(step.duration() * factor);
                }
                copy
            })
            .collect();

        let animation = Animation::new(steps, &self.inner.run_loop);
        *animation.inner.attributes.borrow_mut() = self.inner.attributes.borrow().clone();
        Ok(animation)
    }

    /// The reverse animation: reversed steps in reverse order, same settings,
    /// tags prefixed with [`REVERSE_TAG_PREFIX`] and no user info
    pub fn reverse_animation(&self) -> Animation {
        let steps = self
            .inner
            .steps
            .iter()
            .rev()
            .map(|step| {
                let mut reversed = step.reversed();
                reversed.set_tag(reverse_tag(step.tag()));
                reversed
            })
            .collect();

        let animation = Animation::new(steps, &self.inner.run_loop);
        {
            let attributes = self.inner.attributes.borrow();
            let mut reversed = animation.inner.attributes.borrow_mut();
            reversed.tag = reverse_tag(attributes.tag.as_deref());
            reversed.settings = attributes.settings;
        }
        animation
    }

    // ----------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------

    /// Deliver a notification to a live delegate. Returns false if the
    /// delegate has been dropped, in which case the handle is cleared.
    fn notify(&self, f: impl FnOnce(&dyn AnimationDelegate)) -> bool {
        let resolved = self.inner.delegate.borrow().resolve();
        match resolved {
            DelegateRef::Unset => true,
            DelegateRef::Live(delegate) => {
                f(delegate.as_ref());
                true
            }
            DelegateRef::Gone => {
                *self.inner.delegate.borrow_mut() = DelegateHandle::unset();
                false
            }
        }
    }

    fn cancel_for_lost_delegate(&self) {
        tracing::debug!(tag = ?self.tag(), "Delegate dropped while running, cancelling animation");
        if let Err(e) = self.try_cancel() {
            tracing::debug!("Cancel after delegate loss skipped: {e}");
        }
    }

    /// Start the first step once the delay is over
    fn begin(&self, generation: u64) {
        let animated = {
            let mut playback = self.inner.playback.borrow_mut();
            if !playback.is_current(generation) || playback.phase != Phase::Delaying {
                return;
            }
            playback.delay_task = None;
            playback.will_start_sent = true;
            playback.animated
        };

        if !self.notify(|delegate| delegate.animation_will_start(self, animated)) {
            self.cancel_for_lost_delegate();
            return;
        }

        self.run_steps(generation, 0);
    }

    /// Play steps from `start`, looping over steps that finish synchronously
    fn run_steps(&self, generation: u64, start: usize) {
        let mut index = start;
        loop {
            let (step, context, animated) = {
                let mut playback = self.inner.playback.borrow_mut();
                if !playback.is_current(generation) {
                    return;
                }
                if index >= self.inner.steps.len() {
                    drop(playback);
                    self.finalize(Outcome::Completed);
                    return;
                }
                playback.phase = Phase::Playing {
                    index,
                    finished: false,
                };
                playback.dispatching = true;
                playback.completed_during_dispatch = false;
                (
                    self.inner.steps[index].clone(),
                    playback.context.clone(),
                    playback.animated,
                )
            };

            tracing::trace!(index, tag = ?step.tag(), "Animation step start");
            step.play(&context, animated, self.completion_for(generation, index));

            let completed = {
                let mut playback = self.inner.playback.borrow_mut();
                if playback.generation != generation {
                    return;
                }
                playback.dispatching = false;
                std::mem::take(&mut playback.completed_during_dispatch)
            };

            // Timed steps report back through their completion later
            if !completed || !self.step_finished(generation, index) {
                return;
            }
            index += 1;
        }
    }

    fn completion_for(&self, generation: u64, index: usize) -> StepCompletion {
        let weak: Weak<AnimationInner> = Rc::downgrade(&self.inner);
        StepCompletion::new(move || {
            if let Some(inner) = weak.upgrade() {
                Animation { inner }.on_step_completed(generation, index);
            }
        })
    }

    fn on_step_completed(&self, generation: u64, index: usize) {
        {
            let mut playback = self.inner.playback.borrow_mut();
            let expected = Phase::Playing {
                index,
                finished: false,
            };
            if !playback.is_current(generation) || playback.phase != expected {
                tracing::trace!(index, "Ignoring stale step completion");
                return;
            }
            if playback.dispatching {
                playback.completed_during_dispatch = true;
                return;
            }
        }

        if self.step_finished(generation, index) {
            self.run_steps(generation, index + 1);
        }
    }

    /// Record a naturally finished step and report it. Returns whether the
    /// sequence should go on.
    fn step_finished(&self, generation: u64, index: usize) -> bool {
        let animated = {
            let mut playback = self.inner.playback.borrow_mut();
            playback.phase = Phase::Playing {
                index,
                finished: true,
            };
            playback.animated
        };

        let step = self.inner.steps[index].clone();
        if !self.notify(|delegate| delegate.animation_step_finished(step.as_ref(), animated)) {
            self.cancel_for_lost_delegate();
            return false;
        }

        // The delegate may have cancelled, terminated or replayed us
        self.inner.playback.borrow().is_current(generation)
    }

    /// Switch to a stop mode, returning the steps still to force
    fn begin_stop(&self, mode: StopMode) -> Result<(Range<usize>, StepContext)> {
        let (pending, context, delay_task) = {
            let mut playback = self.inner.playback.borrow_mut();
            if !playback.is_active() {
                return Err(AnimationError::NotRunning);
            }
            if playback.mode != StopMode::Normal {
                return Err(AnimationError::AlreadyStopping);
            }
            let pending = playback.pending_steps(self.inner.steps.len());
            playback.mode = mode;
            playback.animated = false;
            playback.dispatching = false;
            (pending, playback.context.clone(), playback.delay_task.take())
        };

        if let Some(task) = delay_task {
            self.inner.run_loop.cancel(task);
        }
        Ok((pending, context))
    }

    fn finalize(&self, outcome: Outcome) {
        let (generation, animated, release_lock) = {
            let mut playback = self.inner.playback.borrow_mut();
            playback.phase = Phase::Finalizing;
            playback.mode = StopMode::Normal;
            playback.dispatching = false;
            playback.completed_during_dispatch = false;
            playback.delay_task = None;
            (
                playback.generation,
                playback.animated,
                std::mem::take(&mut playback.holds_interaction_lock),
            )
        };

        if release_lock {
            self.inner.run_loop.unlock_interaction();
        }

        tracing::debug!(tag = ?self.tag(), ?outcome, "Animation stopped");

        if outcome != Outcome::Cancelled {
            self.notify(|delegate| delegate.animation_did_stop(self, animated));
        }

        // A play from `did_stop` has already moved on to a new run
        let mut playback = self.inner.playback.borrow_mut();
        if playback.generation == generation && playback.phase == Phase::Finalizing {
            playback.phase = Phase::Idle;
        }
    }
}

impl Drop for AnimationInner {
    fn drop(&mut self) {
        let playback = self.playback.get_mut();
        if let Some(task) = playback.delay_task.take() {
            self.run_loop.cancel(task);
        }
        if std::mem::take(&mut playback.holds_interaction_lock) {
            tracing::debug!("Running animation dropped, releasing interaction lock");
            self.run_loop.unlock_interaction();
        }
    }
}

/// Tag of a reversed animation or step; empty tags stay unset
fn reverse_tag(tag: Option<&str>) -> Option<String> {
    tag.filter(|tag| !tag.is_empty())
        .map(|tag| format!("{REVERSE_TAG_PREFIX}{tag}"))
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("tag", &self.tag())
            .field("steps", &self.inner.steps)
            .field("settings", &self.settings())
            .field("phase", &self.phase())
            .field("delegate", &*self.inner.delegate.borrow())
            .finish()
    }
}
