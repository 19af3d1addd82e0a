//! Static network geometry used for spatial rendering

use geo::{BoundingRect, Coord, LineString, MultiLineString, Rect};

/// Polyline of a single road segment in network space
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    /// Matches `EdgeState::id` of live snapshots
    pub id: String,
    pub polyline: LineString<f64>,
}

/// Road network geometry, loaded once per view session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkGeometry {
    /// `None` when neither the asset nor its coordinates provide bounds
    pub bbox: Option<Rect<f64>>,
    pub edges: Vec<EdgeGeometry>,
}

impl NetworkGeometry {
    pub fn new(bbox: Option<Rect<f64>>, edges: Vec<EdgeGeometry>) -> Self {
        let bbox = bbox.or_else(|| bounds_of(&edges));
        Self { bbox, edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeGeometry> {
        self.edges.iter().find(|e| e.id == id)
    }
}

fn bounds_of(edges: &[EdgeGeometry]) -> Option<Rect<f64>> {
    let lines: MultiLineString<f64> = edges.iter().map(|e| e.polyline.clone()).collect();
    lines.bounding_rect()
}

/// Bounding box from `[minX, minY, maxX, maxY]`
pub fn bbox_from_array([min_x, min_y, max_x, max_y]: [f64; 4]) -> Rect<f64> {
    Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    #[test]
    fn derives_bounds_from_polylines() {
        let geometry = NetworkGeometry::new(
            None,
            vec![
                EdgeGeometry {
                    id: "a".into(),
                    polyline: line_string![(x: 1.0, y: 2.0), (x: 5.0, y: 3.0)],
                },
                EdgeGeometry {
                    id: "b".into(),
                    polyline: line_string![(x: -1.0, y: 0.0), (x: 2.0, y: 8.0)],
                },
            ],
        );
        let bbox = geometry.bbox.unwrap();
        assert_eq!(bbox.min(), Coord { x: -1.0, y: 0.0 });
        assert_eq!(bbox.max(), Coord { x: 5.0, y: 8.0 });
    }

    #[test]
    fn explicit_bounds_take_precedence() {
        let bbox = bbox_from_array([0.0, 0.0, 100.0, 50.0]);
        let geometry = NetworkGeometry::new(
            Some(bbox),
            vec![EdgeGeometry {
                id: "a".into(),
                polyline: line_string![(x: 1.0, y: 2.0), (x: 5.0, y: 3.0)],
            }],
        );
        assert_eq!(geometry.bbox, Some(bbox));
    }

    #[test]
    fn empty_geometry_has_no_bounds() {
        assert!(NetworkGeometry::new(None, vec![]).bbox.is_none());
    }
}
