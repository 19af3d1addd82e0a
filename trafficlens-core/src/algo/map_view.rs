//! Spatial view over the static network and the latest edge metrics.
//!
//! Projected polylines are cached and rebuilt only when the geometry or the
//! projection parameters change. Per frame, live metrics are joined onto the
//! cached polylines by edge id.

use geo::LineString;
use hashbrown::{HashMap, HashSet};
use log::debug;

use super::projection::{Projection, ProjectionParams, Viewport};
use crate::model::{EdgeState, NetworkGeometry};
use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEdge {
    pub id: String,
    pub points: LineString<f64>,
}

/// Edge drawn on top of the base network because live metrics exist for it
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayEdge<'a> {
    pub id: &'a str,
    pub points: &'a LineString<f64>,
    pub metrics: &'a EdgeState,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene<'a> {
    /// Every edge of the network, in asset order
    pub base: &'a [ProjectedEdge],
    /// Edges with live data
    pub overlay: Vec<OverlayEdge<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapFrame<'a> {
    /// Geometry not loaded yet or without bounds
    Loading,
    Ready(Scene<'a>),
}

/// What a pointer press landed on, as reported by the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Edge(String),
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct MapView {
    geometry: Option<NetworkGeometry>,
    params: ProjectionParams,
    projection: Option<Projection>,
    projected: Vec<ProjectedEdge>,
    rendered: HashSet<String>,
    selected: Option<String>,
    rebuilds: usize,
}

impl MapView {
    pub fn new(params: ProjectionParams) -> Result<Self, Error> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    /// Installs (or removes) the session's geometry and reprojects it.
    pub fn set_geometry(&mut self, geometry: Option<NetworkGeometry>) -> Result<(), Error> {
        self.geometry = geometry;
        self.rebuild()
    }

    /// Changes projection parameters, rebuilding only when they differ.
    ///
    /// Returns whether the cached projection was rebuilt. Invalid parameters
    /// are rejected and the previous ones stay in effect.
    pub fn set_params(&mut self, params: ProjectionParams) -> Result<bool, Error> {
        if params == self.params {
            return Ok(false);
        }
        params.validate()?;
        self.params = params;
        self.rebuild()?;
        Ok(true)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<bool, Error> {
        self.set_params(ProjectionParams {
            viewport,
            ..self.params
        })
    }

    pub fn set_padding(&mut self, padding: f64) -> Result<bool, Error> {
        self.set_params(ProjectionParams {
            padding,
            ..self.params
        })
    }

    pub fn params(&self) -> ProjectionParams {
        self.params
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    /// Number of times the projection cache has been rebuilt
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Joins the cached polylines with `live` edge metrics.
    pub fn frame<'a>(&'a mut self, live: &'a [EdgeState]) -> MapFrame<'a> {
        if self.projection.is_none() {
            self.rendered.clear();
            return MapFrame::Loading;
        }

        let by_id: HashMap<&str, &EdgeState> = live.iter().map(|e| (e.id.as_str(), e)).collect();
        self.rendered = self
            .projected
            .iter()
            .filter(|edge| by_id.contains_key(edge.id.as_str()))
            .map(|edge| edge.id.clone())
            .collect();

        let selected = self.selected.as_deref();
        let overlay = self
            .projected
            .iter()
            .filter_map(|edge| {
                by_id.get(edge.id.as_str()).map(|&metrics| OverlayEdge {
                    id: &edge.id,
                    points: &edge.points,
                    metrics,
                    selected: selected == Some(edge.id.as_str()),
                })
            })
            .collect();

        MapFrame::Ready(Scene {
            base: &self.projected,
            overlay,
        })
    }

    /// Updates the selection from a click on the last rendered frame.
    ///
    /// Only overlay edges are clickable; a click anywhere else clears.
    pub fn click(&mut self, target: ClickTarget) -> Option<&str> {
        self.selected = match target {
            ClickTarget::Edge(id) if self.rendered.contains(&id) => Some(id),
            ClickTarget::Edge(_) | ClickTarget::Background => None,
        };
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Latest metrics for the selected edge
    pub fn selected_metrics<'a>(&self, live: &'a [EdgeState]) -> Option<&'a EdgeState> {
        let id = self.selected.as_deref()?;
        live.iter().find(|e| e.id == id)
    }

    fn rebuild(&mut self) -> Result<(), Error> {
        let Some(bbox) = self.geometry.as_ref().and_then(|g| g.bbox) else {
            self.projection = None;
            self.projected.clear();
            return Ok(());
        };

        let projection = Projection::fit(bbox, self.params)?;
        self.projected = self
            .geometry
            .iter()
            .flat_map(|geometry| projection.project_network(geometry))
            .map(|(id, points)| ProjectedEdge { id, points })
            .collect();
        self.projection = Some(projection);
        self.rebuilds += 1;
        debug!(
            "Projected {} edges at scale {:.3}",
            self.projected.len(),
            projection.scale()
        );
        Ok(())
    }
}
