//! Canvas configuration.
//!
//! Fixed geometry and zoom bounds shared by the controller, projection, and
//! hit testing. Hosts may override any subset of fields with a JSON object.

use serde::{Deserialize, Serialize};

/// Configuration for a canvas instance.
///
/// All lengths are in logical units; the projection scales them by zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Lower zoom bound. Default: **0.5**.
    pub min_zoom: f32,
    /// Upper zoom bound. Default: **2.0**.
    pub max_zoom: f32,
    /// Increment used by zoom-in / zoom-out controls. Default: **0.1**.
    pub zoom_step: f32,
    /// Fixed node box size.
    pub node_width: f32,
    pub node_height: f32,
    /// Radius of the input/output connector handles.
    pub handle_radius: f32,
    /// Max screen-pixel distance from an edge curve that still counts as a hit.
    pub edge_hit_tolerance: f32,
    /// Minimum horizontal reach of edge control points.
    pub min_curve_offset: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.1,
            node_width: 160.0,
            node_height: 56.0,
            handle_radius: 6.0,
            edge_hit_tolerance: 6.0,
            min_curve_offset: 40.0,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON config. Missing fields keep defaults.
    ///
    /// # Errors
    /// Returns a message if the JSON is malformed or the values are unusable.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: CanvasConfig =
            serde_json::from_str(json).map_err(|e| format!("invalid canvas config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that zoom bounds and geometry are positive and ordered.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("zoom_step", self.zoom_step),
            ("node_width", self.node_width),
            ("node_height", self.node_height),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive number, got {value}"));
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) exceeds max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if !(self.handle_radius >= 0.0 && self.edge_hit_tolerance >= 0.0) {
            return Err("handle_radius and edge_hit_tolerance must be non-negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CanvasConfig::from_json(r#"{ "max_zoom": 3.0 }"#).unwrap();
        assert_eq!(config.max_zoom, 3.0);
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.node_width, 160.0);
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = CanvasConfig::from_json(r#"{ "min_zoom": 2.5, "max_zoom": 1.0 }"#).unwrap_err();
        assert!(err.contains("min_zoom"), "unexpected error: {err}");
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(CanvasConfig::from_json("{ max_zoom: }").is_err());
    }

    #[test]
    fn default_is_valid() {
        assert!(CanvasConfig::default().validate().is_ok());
    }
}
