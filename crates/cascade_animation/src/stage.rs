// SPDX-License-Identifier: MIT OR Apache-2.0
//! Elements animated by steps, and the stage holding them in z-order.

use crate::curve::{lerp, lerp_vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

/// Element ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Create a new random element ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned frame of an element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    /// Top-left corner
    pub origin: [f32; 2],
    /// Width and height
    pub size: [f32; 2],
}

impl Rect {
    /// Create a frame from origin and size
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: [x, y],
            size: [width, height],
        }
    }

    /// Centre point
    pub fn center(&self) -> [f32; 2] {
        [
            self.origin[0] + self.size[0] / 2.0,
            self.origin[1] + self.size[1] / 2.0,
        ]
    }

    /// Scale about the centre, then translate
    pub fn scaled_and_translated(&self, scale: [f32; 2], translation: [f32; 2]) -> Self {
        let center = self.center();
        let size = [self.size[0] * scale[0], self.size[1] * scale[1]];
        Self {
            origin: [
                center[0] - size[0] / 2.0 + translation[0],
                center[1] - size[1] / 2.0 + translation[1],
            ],
            size,
        }
    }

    /// Component-wise interpolation
    pub fn lerp(&self, other: &Rect, t: f32) -> Rect {
        Rect {
            origin: lerp_vec2(self.origin, other.origin, t),
            size: lerp_vec2(self.size, other.size, t),
        }
    }
}

/// Shape-only transform: translation, scale and rotation (radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementTransform {
    /// Translation
    pub translation: [f32; 2],
    /// Scale factors
    pub scale: [f32; 2],
    /// Rotation in radians
    pub rotation: f32,
}

impl ElementTransform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0],
        scale: [1.0, 1.0],
        rotation: 0.0,
    };

    /// Pure translation
    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            translation: [x, y],
            ..Self::IDENTITY
        }
    }

    /// Pure scale
    pub fn scale(x: f32, y: f32) -> Self {
        Self {
            scale: [x, y],
            ..Self::IDENTITY
        }
    }

    /// Pure rotation
    pub fn rotation(radians: f32) -> Self {
        Self {
            rotation: radians,
            ..Self::IDENTITY
        }
    }

    /// Add a translation
    pub fn with_translation(mut self, x: f32, y: f32) -> Self {
        self.translation = [x, y];
        self
    }

    /// Add a scale
    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale = [x, y];
        self
    }

    /// Whether this transform contains a rotation
    pub fn has_rotation(&self) -> bool {
        self.rotation.abs() > f32::EPSILON
    }

    /// Apply `other` after `self`
    pub fn then(&self, other: &ElementTransform) -> ElementTransform {
        ElementTransform {
            translation: [
                self.translation[0] + other.translation[0],
                self.translation[1] + other.translation[1],
            ],
            scale: [self.scale[0] * other.scale[0], self.scale[1] * other.scale[1]],
            rotation: self.rotation + other.rotation,
        }
    }

    /// Transform undoing this one. Zero scale factors are left untouched.
    pub fn inverse(&self) -> ElementTransform {
        let invert = |s: f32| if s.abs() > f32::EPSILON { 1.0 / s } else { s };
        ElementTransform {
            translation: [-self.translation[0], -self.translation[1]],
            scale: [invert(self.scale[0]), invert(self.scale[1])],
            rotation: -self.rotation,
        }
    }

    /// Fraction `t` of this transform, starting from identity
    pub fn interpolate(&self, t: f32) -> ElementTransform {
        let identity = Self::IDENTITY;
        ElementTransform {
            translation: lerp_vec2(identity.translation, self.translation, t),
            scale: lerp_vec2(identity.scale, self.scale, t),
            rotation: lerp(identity.rotation, self.rotation, t),
        }
    }
}

impl Default for ElementTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An element on the stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Display name
    pub name: String,
    /// Frame in stage coordinates
    pub frame: Rect,
    /// Shape-only transform
    pub transform: ElementTransform,
    /// Opacity
    pub alpha: f32,
}

impl Element {
    /// Create an opaque element with an identity transform
    pub fn new(name: impl Into<String>, frame: Rect) -> Self {
        Self {
            name: name.into(),
            frame,
            transform: ElementTransform::IDENTITY,
            alpha: 1.0,
        }
    }

    /// Set the initial opacity
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Handle to a set of elements kept in z-order (back to front)
///
/// Clones share the same elements.
#[derive(Debug, Clone, Default)]
pub struct Stage {
    elements: Rc<RefCell<IndexMap<ElementId, Element>>>,
}

impl Stage {
    /// Create an empty stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element on top of the others
    pub fn add_element(&self, element: Element) -> ElementId {
        let id = ElementId::new();
        self.elements.borrow_mut().insert(id, element);
        id
    }

    /// Remove an element
    pub fn remove_element(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow_mut().shift_remove(&id)
    }

    /// Snapshot of an element
    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.elements.borrow().get(&id).cloned()
    }

    /// Whether the element is on the stage
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.borrow().contains_key(&id)
    }

    /// Mutate an element in place. Returns false if it is not on the stage.
    pub fn update(&self, id: ElementId, f: impl FnOnce(&mut Element)) -> bool {
        match self.elements.borrow_mut().get_mut(&id) {
            Some(element) => {
                f(element);
                true
            }
            None => false,
        }
    }

    /// Element IDs from back to front
    pub fn z_order(&self) -> Vec<ElementId> {
        self.elements.borrow().keys().copied().collect()
    }

    /// Raise an element above all of its siblings
    pub fn bring_to_front(&self, id: ElementId) {
        let mut elements = self.elements.borrow_mut();
        if let Some(index) = elements.get_index_of(&id) {
            let last = elements.len() - 1;
            elements.move_index(index, last);
        }
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.elements.borrow().len()
    }
}
