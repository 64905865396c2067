//! Screen ↔ logical coordinate transforms.
//!
//! The canvas has a single uniform zoom and no pan offset of its own (the
//! host scrolls natively). Screen coordinates are relative to the canvas
//! origin; logical coordinates are what node positions are stored in.

use crate::config::CanvasConfig;
use crate::model::Point;

/// Convert a screen-space point to logical canvas space.
pub fn screen_to_logical(screen: Point, zoom: f32) -> Point {
    Point::new(screen.x / zoom, screen.y / zoom)
}

/// Convert a logical canvas point to screen space.
pub fn logical_to_screen(logical: Point, zoom: f32) -> Point {
    Point::new(logical.x * zoom, logical.y * zoom)
}

/// Clamp a requested zoom into the configured bounds.
/// Returns `None` for NaN, which carries no usable magnitude.
pub fn clamp_zoom(requested: f32, config: &CanvasConfig) -> Option<f32> {
    if requested.is_nan() {
        return None;
    }
    Some(requested.clamp(config.min_zoom, config.max_zoom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_at_supported_zooms() {
        let screen = Point::new(123.5, 87.25);
        for zoom in [0.5, 1.0, 2.0] {
            let back = logical_to_screen(screen_to_logical(screen, zoom), zoom);
            assert!((back.x - screen.x).abs() < 1e-4, "x drift at zoom {zoom}");
            assert!((back.y - screen.y).abs() < 1e-4, "y drift at zoom {zoom}");
        }
    }

    #[test]
    fn screen_to_logical_divides_by_zoom() {
        let p = screen_to_logical(Point::new(200.0, 100.0), 2.0);
        assert_eq!(p, Point::new(100.0, 50.0));
    }

    #[test]
    fn clamp_zoom_bounds() {
        let config = CanvasConfig::default();
        assert_eq!(clamp_zoom(10.0, &config), Some(2.0));
        assert_eq!(clamp_zoom(0.01, &config), Some(0.5));
        assert_eq!(clamp_zoom(-3.0, &config), Some(0.5));
        assert_eq!(clamp_zoom(f32::INFINITY, &config), Some(2.0));
        assert_eq!(clamp_zoom(1.25, &config), Some(1.25));
        assert_eq!(clamp_zoom(f32::NAN, &config), None);
    }
}
