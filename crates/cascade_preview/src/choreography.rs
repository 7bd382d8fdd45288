// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo choreography played by the preview runner.

use cascade_animation::{
    Animation, AnimationCurve, AnimationDelegate, AnimationSettings, AnimationStep, Element,
    ElementAnimation, ElementId, ElementTransform, Rect, RunLoop, Stage, ViewAnimationStep,
};
use std::rc::Rc;

/// Simulated frame length
const FRAME: f64 = 1.0 / 60.0;

/// Upper bound on simulated time per run
const MAX_RUN_TIME: f64 = 30.0;

/// Delegate forwarding lifecycle events to the log
struct EventLogger;

impl AnimationDelegate for EventLogger {
    fn animation_will_start(&self, animation: &Animation, animated: bool) {
        tracing::info!(tag = ?animation.tag(), animated, "Animation will start");
    }

    fn animation_did_stop(&self, animation: &Animation, animated: bool) {
        tracing::info!(tag = ?animation.tag(), animated, "Animation did stop");
    }

    fn animation_step_finished(&self, step: &dyn AnimationStep, animated: bool) {
        tracing::info!(tag = ?step.tag(), animated, "Step finished");
    }
}

struct Scene {
    stage: Stage,
    title: ElementId,
    card: ElementId,
    button: ElementId,
}

impl Scene {
    fn new() -> Self {
        let stage = Stage::new();
        let title = stage.add_element(Element::new("title", Rect::new(20.0, 20.0, 280.0, 40.0)).with_alpha(0.0));
        let card = stage.add_element(Element::new("card", Rect::new(20.0, 80.0, 280.0, 160.0)));
        let button = stage.add_element(Element::new("button", Rect::new(100.0, 260.0, 120.0, 44.0)).with_alpha(0.0));
        Self {
            stage,
            title,
            card,
            button,
        }
    }

    fn build_animation(&self, run_loop: &RunLoop) -> Animation {
        let reveal_title = ViewAnimationStep::new(&self.stage)
            .with_tag("reveal_title")
            .with_duration(0.3)
            .with_curve(AnimationCurve::EaseOut)
            .with_element(self.title, ElementAnimation::new().with_alpha_variation(1.0));

        let slide_card = ViewAnimationStep::new(&self.stage)
            .with_tag("slide_card")
            .with_duration(0.5)
            .with_element(
                self.card,
                ElementAnimation::new().with_transform(ElementTransform::translation(0.0, -20.0).with_scale(1.1, 1.1)),
            );

        let show_button = ViewAnimationStep::new(&self.stage)
            .with_tag("show_button")
            .with_duration(0.25)
            .with_curve(AnimationCurve::EaseIn)
            .with_element(self.button, ElementAnimation::new().with_alpha_variation(1.0))
            .with_element(self.card, ElementAnimation::new().with_alpha_variation(-0.3));

        let animation = Animation::from_steps([reveal_title, slide_card, show_button], run_loop);
        animation.set_tag(Some("intro".to_string()));
        animation
    }

    fn log_state(&self, label: &str) {
        for id in self.stage.z_order() {
            if let Some(element) = self.stage.element(id) {
                tracing::info!(
                    "[{label}] {:<8} alpha={:.2} translation={:?} scale={:?} frame={:?}",
                    element.name,
                    element.alpha,
                    element.transform.translation,
                    element.transform.scale,
                    element.frame,
                );
            }
        }
    }
}

/// Play the demo choreography with `settings`
pub fn run(settings: AnimationSettings) {
    let run_loop = RunLoop::new();
    let scene = Scene::new();
    let logger = Rc::new(EventLogger);

    let animation = scene.build_animation(&run_loop);
    animation.apply_settings(settings);
    animation.set_delegate(&logger);

    tracing::info!(
        duration = animation.duration(),
        card_alpha_variation = animation.alpha_variation_for_element(scene.card),
        "Playing forward"
    );
    animation.play(true);
    let elapsed = run_loop.run_until_idle(FRAME, MAX_RUN_TIME);
    tracing::info!(elapsed, "Forward playback done");
    scene.log_state("forward");

    let reverse = animation.reverse_animation();
    reverse.set_delegate(&logger);
    reverse.play(true);
    run_loop.run_until_idle(FRAME, MAX_RUN_TIME);
    scene.log_state("reverse");

    match animation.with_duration(0.5) {
        Some(quick) => {
            quick.set_delegate(&logger);
            tracing::info!(duration = quick.duration(), "Playing re-timed copy instantaneously");
            quick.play(false);
            scene.log_state("instant");
        }
        None => tracing::warn!("Re-timed copy unavailable"),
    }

    let rewind = animation.reverse_animation();
    rewind.set_delegate(&logger);
    rewind.play(true);
    run_loop.advance(0.4);
    tracing::info!(cursor = ?rewind.cursor(), "Terminating mid-flight");
    rewind.terminate();
    scene.log_state("terminated");
}
