//! Fit-to-viewport projection of network coordinates.
//!
//! Network space has Y growing upward, viewport space has Y growing
//! downward, so the vertical axis is flipped. A single uniform scale keeps
//! the geometry undistorted and the result is centered in the viewport.

use geo::{Coord, LineString, Rect};
use rayon::prelude::*;

use crate::model::NetworkGeometry;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1000.0, 700.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    pub viewport: Viewport,
    /// Fraction of the bounds added on every side; negative values crop
    pub padding: f64,
    /// Multiplier on the fitted scale, `1.0` is an exact fit
    pub zoom: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            padding: -0.1,
            zoom: 1.0,
        }
    }
}

impl ProjectionParams {
    /// Padding at or below `-0.5` would collapse the bounds.
    pub fn validate(&self) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "viewport must be positive, got {width}x{height}"
            )));
        }
        if !(self.padding.is_finite() && 1.0 + 2.0 * self.padding > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "padding must be greater than -0.5, got {}",
                self.padding
            )));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "zoom must be positive, got {}",
                self.zoom
            )));
        }
        Ok(())
    }
}

/// Precomputed transform from network space into a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Lower-left corner of the padded bounds
    origin: Coord<f64>,
    padded_height: f64,
    scale: f64,
    offset: Coord<f64>,
}

impl Projection {
    /// Fits `bbox` into the viewport described by `params`.
    ///
    /// Width and height of the bounds are floored at 1 so degenerate
    /// (point or axis-aligned line) networks still project.
    pub fn fit(bbox: Rect<f64>, params: ProjectionParams) -> Result<Self, Error> {
        params.validate()?;
        let min = bbox.min();
        let max = bbox.max();
        let w = (max.x - min.x).max(1.0);
        let h = (max.y - min.y).max(1.0);

        let origin = Coord {
            x: min.x - w * params.padding,
            y: min.y - h * params.padding,
        };
        let padded_width = w * (1.0 + 2.0 * params.padding);
        let padded_height = h * (1.0 + 2.0 * params.padding);

        let Viewport { width, height } = params.viewport;
        let scale = (width / padded_width).min(height / padded_height) * params.zoom;
        let offset = Coord {
            x: (width - padded_width * scale) / 2.0,
            y: (height - padded_height * scale) / 2.0,
        };

        Ok(Self {
            origin,
            padded_height,
            scale,
            offset,
        })
    }

    pub fn project(&self, point: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.offset.x + (point.x - self.origin.x) * self.scale,
            y: self.offset.y + (self.padded_height - (point.y - self.origin.y)) * self.scale,
        }
    }

    pub fn project_polyline(&self, polyline: &LineString<f64>) -> LineString<f64> {
        polyline.coords().map(|c| self.project(*c)).collect()
    }

    /// Projects every edge of `network`, preserving edge order
    pub fn project_network(&self, network: &NetworkGeometry) -> Vec<(String, LineString<f64>)> {
        network
            .edges
            .par_iter()
            .map(|edge| (edge.id.clone(), self.project_polyline(&edge.polyline)))
            .collect()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Top-left corner of the projected content inside the viewport
    pub fn offset(&self) -> Coord<f64> {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bbox_from_array;
    use geo::line_string;

    const EPS: f64 = 1e-9;

    fn params(width: f64, height: f64, padding: f64) -> ProjectionParams {
        ProjectionParams {
            viewport: Viewport::new(width, height),
            padding,
            zoom: 1.0,
        }
    }

    fn assert_close(actual: Coord<f64>, expected: (f64, f64)) {
        assert!(
            (actual.x - expected.0).abs() < EPS && (actual.y - expected.1).abs() < EPS,
            "expected {expected:?}, got ({}, {})",
            actual.x,
            actual.y
        );
    }

    #[test]
    fn corners_map_to_viewport_corners() {
        let bbox = bbox_from_array([0.0, 0.0, 100.0, 100.0]);
        let projection = Projection::fit(bbox, params(800.0, 600.0, 0.0)).unwrap();

        assert_eq!(projection.scale(), 6.0);
        assert_close(projection.offset(), (100.0, 0.0));
        // network top-left lands on the content's top-left
        assert_close(projection.project(Coord { x: 0.0, y: 100.0 }), (100.0, 0.0));
        // network bottom-right lands on the opposite corner
        assert_close(projection.project(Coord { x: 100.0, y: 0.0 }), (700.0, 600.0));
        assert_close(projection.project(Coord { x: 50.0, y: 50.0 }), (400.0, 300.0));
    }

    #[test]
    fn positive_padding_shrinks_content() {
        let bbox = bbox_from_array([0.0, 0.0, 100.0, 100.0]);
        let projection = Projection::fit(bbox, params(600.0, 600.0, 0.25)).unwrap();
        // padded extent is 150 units over 600 pixels
        assert_eq!(projection.scale(), 4.0);
        assert_close(projection.project(Coord { x: 0.0, y: 100.0 }), (100.0, 100.0));
        assert_close(projection.project(Coord { x: 100.0, y: 0.0 }), (500.0, 500.0));
    }

    #[test]
    fn negative_padding_crops_past_bounds() {
        let bbox = bbox_from_array([0.0, 0.0, 100.0, 100.0]);
        let projection = Projection::fit(bbox, params(800.0, 800.0, -0.1)).unwrap();
        assert_eq!(projection.scale(), 10.0);
        assert_close(projection.project(Coord { x: 10.0, y: 90.0 }), (0.0, 0.0));
        assert_close(projection.project(Coord { x: 0.0, y: 100.0 }), (-100.0, -100.0));
    }

    #[test]
    fn degenerate_bounds_are_floored() {
        let bbox = bbox_from_array([5.0, 5.0, 5.0, 5.0]);
        let projection = Projection::fit(bbox, params(100.0, 100.0, 0.0)).unwrap();
        assert!(projection.scale().is_finite());
        assert_close(projection.project(Coord { x: 5.0, y: 5.0 }), (0.0, 100.0));
    }

    #[test]
    fn projection_is_pure() {
        let bbox = bbox_from_array([-20.0, 3.0, 480.0, 260.0]);
        let first = Projection::fit(bbox, ProjectionParams::default()).unwrap();
        let second = Projection::fit(bbox, ProjectionParams::default()).unwrap();
        assert_eq!(first, second);

        let line = line_string![(x: 0.0, y: 10.0), (x: 200.0, y: 100.0), (x: 480.0, y: 3.0)];
        assert_eq!(first.project_polyline(&line), second.project_polyline(&line));
        assert_eq!(first.project_polyline(&line), first.project_polyline(&line));
    }

    #[test]
    fn rejects_collapsing_parameters() {
        let bbox = bbox_from_array([0.0, 0.0, 1.0, 1.0]);
        assert!(Projection::fit(bbox, params(0.0, 100.0, 0.0)).is_err());
        assert!(Projection::fit(bbox, params(100.0, 100.0, -0.5)).is_err());
        let zoomed_out = ProjectionParams {
            zoom: 0.0,
            ..params(100.0, 100.0, 0.0)
        };
        assert!(Projection::fit(bbox, zoomed_out).is_err());
    }

    #[test]
    fn zoom_scales_around_center() {
        let bbox = bbox_from_array([0.0, 0.0, 100.0, 100.0]);
        let zoomed = ProjectionParams {
            zoom: 2.0,
            ..params(100.0, 100.0, 0.0)
        };
        let projection = Projection::fit(bbox, zoomed).unwrap();
        assert_close(projection.project(Coord { x: 50.0, y: 50.0 }), (50.0, 50.0));
        assert_close(projection.project(Coord { x: 0.0, y: 100.0 }), (-50.0, -50.0));
    }
}
