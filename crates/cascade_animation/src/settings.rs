// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation playback settings.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Playback flags shared by animations built from the same configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnimationSettings {
    /// Alter element frames instead of shape-only transforms
    pub resize_views: bool,
    /// Block host interaction while the animation runs
    pub locking_ui: bool,
    /// Raise animated elements above their siblings (not restored)
    pub bring_to_front: bool,
    /// Seconds to wait before the first step of an animated play
    pub delay: f64,
}

impl AnimationSettings {
    /// Parse settings from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        let settings: Self = ron::from_str(text)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Copy with a negative delay clamped to zero
    pub fn sanitized(mut self) -> Self {
        self.delay = self.delay.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AnimationSettings::default();
        assert!(!settings.resize_views);
        assert!(!settings.locking_ui);
        assert!(!settings.bring_to_front);
        assert_eq!(settings.delay, 0.0);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings = AnimationSettings::from_ron("(locking_ui: true, delay: 0.5)").unwrap();
        assert!(settings.locking_ui);
        assert!(!settings.resize_views);
        assert_eq!(settings.delay, 0.5);
    }

    #[test]
    fn test_negative_delay_is_clamped() {
        let settings = AnimationSettings::from_ron("(delay: -2.0)").unwrap();
        assert_eq!(settings.delay, 0.0);
    }

    #[test]
    fn test_ron_round_trip() {
        let settings = AnimationSettings {
            bring_to_front: true,
            delay: 1.25,
            ..Default::default()
        };
        let text = settings.to_ron().unwrap();
        assert_eq!(AnimationSettings::from_ron(&text).unwrap(), settings);
    }

    #[test]
    fn test_invalid_ron_is_an_error() {
        assert!(AnimationSettings::from_ron("(delay: \"soon\")").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = Path::new("definitely/not/here/cascade.ron");
        assert!(matches!(
            AnimationSettings::load(path),
            Err(crate::error::AnimationError::Io(_))
        ));
    }
}
