//! Simulation debug settings
//!
//! Loaded from JSON next to the level data. Everything defaults to off.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Debug/simulation toggles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Free flight: no gravity, up/down steer vertically with damping
    pub no_gravity: bool,
    /// Skip horizontal integration (collision debugging)
    pub freeze_x: bool,
    /// Skip vertical integration (collision debugging)
    pub freeze_y: bool,
    /// Trace every ejection at debug level
    pub trace_hits: bool,
}

impl SimSettings {
    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from disk, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(SimError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    /// Whether horizontal integration runs this tick
    pub fn integrate_x(&self) -> bool {
        !self.freeze_x
    }

    /// Whether vertical integration runs this tick
    pub fn integrate_y(&self) -> bool {
        !self.freeze_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = SimSettings::from_json(r#"{ "no_gravity": true }"#).unwrap();
        assert!(settings.no_gravity);
        assert!(settings.integrate_x());
        assert!(settings.integrate_y());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            SimSettings::from_json("{ nope"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = SimSettings::load(Path::new("/definitely/not/here.json"));
        assert_eq!(settings, SimSettings::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = SimSettings {
            freeze_y: true,
            ..Default::default()
        };
        let back = SimSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(back, settings);
    }
}
