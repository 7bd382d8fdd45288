// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation observers.
//!
//! Animations never own their delegate. The [`DelegateHandle`] holds a weak
//! reference which stops resolving as soon as the delegate is dropped, so
//! notifications to a destroyed observer become no-ops.

use crate::animation::Animation;
use crate::step::AnimationStep;
use std::rc::{Rc, Weak};

/// Receiver of animation lifecycle events. All methods are optional.
pub trait AnimationDelegate {
    /// Called right before the first step starts, after any delay
    fn animation_will_start(&self, _animation: &Animation, _animated: bool) {}

    /// Called right after the last step has finished. Not called for
    /// cancelled animations.
    fn animation_did_stop(&self, _animation: &Animation, _animated: bool) {}

    /// Called when a step has finished
    fn animation_step_finished(&self, _step: &dyn AnimationStep, _animated: bool) {}
}

/// Result of resolving a [`DelegateHandle`]
pub enum DelegateRef {
    /// No delegate was ever set
    Unset,
    /// The delegate is alive
    Live(Rc<dyn AnimationDelegate>),
    /// The delegate has been dropped
    Gone,
}

/// Non-owning, auto-invalidating reference to a delegate
#[derive(Clone, Default)]
pub struct DelegateHandle {
    delegate: Option<Weak<dyn AnimationDelegate>>,
}

impl DelegateHandle {
    /// Handle without a delegate
    pub fn unset() -> Self {
        Self::default()
    }

    /// Handle observing `delegate` without keeping it alive
    pub fn new<D: AnimationDelegate + 'static>(delegate: &Rc<D>) -> Self {
        let weak: Weak<D> = Rc::downgrade(delegate);
        let weak: Weak<dyn AnimationDelegate> = weak;
        Self {
            delegate: Some(weak),
        }
    }

    /// Handle from an already type-erased delegate
    pub fn from_dyn(delegate: &Rc<dyn AnimationDelegate>) -> Self {
        Self {
            delegate: Some(Rc::downgrade(delegate)),
        }
    }

    /// Resolve the delegate
    pub fn resolve(&self) -> DelegateRef {
        match &self.delegate {
            None => DelegateRef::Unset,
            Some(weak) => match weak.upgrade() {
                Some(delegate) => DelegateRef::Live(delegate),
                None => DelegateRef::Gone,
            },
        }
    }

    /// Whether a delegate was set
    pub fn is_set(&self) -> bool {
        self.delegate.is_some()
    }

    /// Whether the delegate was set and has since been dropped
    pub fn is_gone(&self) -> bool {
        matches!(self.resolve(), DelegateRef::Gone)
    }
}

impl std::fmt::Debug for DelegateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.resolve() {
            DelegateRef::Unset => "unset",
            DelegateRef::Live(_) => "live",
            DelegateRef::Gone => "gone",
        };
        f.debug_tuple("DelegateHandle").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Observer;

    impl AnimationDelegate for Observer {}

    #[test]
    fn test_handle_does_not_keep_delegate_alive() {
        let observer = Rc::new(Observer);
        let handle = DelegateHandle::new(&observer);

        assert!(matches!(handle.resolve(), DelegateRef::Live(_)));
        assert_eq!(Rc::strong_count(&observer), 1);

        drop(observer);
        assert!(matches!(handle.resolve(), DelegateRef::Gone));
        assert!(handle.is_gone());
    }

    #[test]
    fn test_unset_handle() {
        let handle = DelegateHandle::unset();
        assert!(matches!(handle.resolve(), DelegateRef::Unset));
        assert!(!handle.is_set());
        assert!(!handle.is_gone());
    }

    #[test]
    fn test_typed_and_erased_handles_resolve_alike() {
        let observer = Rc::new(Observer);
        let erased: Rc<dyn AnimationDelegate> = observer.clone();

        let typed = DelegateHandle::new(&observer);
        let from_dyn = DelegateHandle::from_dyn(&erased);
        assert!(matches!(typed.resolve(), DelegateRef::Live(_)));
        assert!(matches!(from_dyn.resolve(), DelegateRef::Live(_)));

        drop(erased);
        drop(observer);
        assert!(typed.is_gone());
        assert!(from_dyn.is_gone());
    }
}
