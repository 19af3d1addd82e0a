use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use geo::{Coord, CoordsIter, LineString};
use geojson::GeoJson;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::model::{EdgeGeometry, NetworkGeometry, bbox_from_array};
use crate::Error;

/// Wire shape of the static geometry asset
///
/// `{ "bbox_xy": [minX, minY, maxX, maxY], "edges": [{ "id", "coords": [[x, y], ...] }] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox_xy: Option<[f64; 4]>,
    #[serde(default)]
    pub edges: Vec<AssetEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEdge {
    pub id: String,
    pub coords: Vec<[f64; 2]>,
}

impl TryFrom<NetworkAsset> for NetworkGeometry {
    type Error = Error;

    fn try_from(asset: NetworkAsset) -> Result<Self, Self::Error> {
        let bbox = match asset.bbox_xy {
            Some(raw) => {
                let [min_x, min_y, max_x, max_y] = raw;
                if raw.iter().any(|v| !v.is_finite()) || min_x > max_x || min_y > max_y {
                    return Err(Error::InvalidData(format!("invalid bbox_xy {raw:?}")));
                }
                Some(bbox_from_array(raw))
            }
            None => None,
        };

        let mut edges = Vec::with_capacity(asset.edges.len());
        for edge in asset.edges {
            if edge.coords.iter().flatten().any(|v| !v.is_finite()) {
                return Err(Error::InvalidData(format!(
                    "edge {} has non-finite coordinates",
                    edge.id
                )));
            }
            if edge.coords.len() < 2 {
                warn!("Edge {} has fewer than two coordinates", edge.id);
            }
            let polyline: LineString<f64> = edge
                .coords
                .into_iter()
                .map(|[x, y]| Coord { x, y })
                .collect();
            edges.push(EdgeGeometry {
                id: edge.id,
                polyline,
            });
        }

        Ok(NetworkGeometry::new(bbox, edges))
    }
}

impl From<&NetworkGeometry> for NetworkAsset {
    fn from(geometry: &NetworkGeometry) -> Self {
        Self {
            bbox_xy: geometry.bbox.map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            edges: geometry
                .edges
                .iter()
                .map(|e| AssetEdge {
                    id: e.id.clone(),
                    coords: e.polyline.coords().map(|c| [c.x, c.y]).collect(),
                })
                .collect(),
        }
    }
}

/// Parses the JSON geometry asset
pub fn network_from_json_str(json: &str) -> Result<NetworkGeometry, Error> {
    let asset: NetworkAsset = serde_json::from_str(json)?;
    asset.try_into()
}

/// Parses a `GeoJSON` `FeatureCollection` of line features.
///
/// The edge id is read from the `id` property; features without one are
/// numbered by position. Multi-part lines become one edge per part.
pub fn network_from_geojson_str(json: &str) -> Result<NetworkGeometry, Error> {
    let geojson: GeoJson = json
        .parse()
        .map_err(|e: geojson::Error| Error::GeometryError(e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(Error::GeometryError(
            "expected a GeoJSON FeatureCollection".to_string(),
        ));
    };

    let mut edges = Vec::new();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = match feature.property("id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => index.to_string(),
        };

        let Some(geometry) = feature.geometry else {
            debug!("Skipping feature {id} without geometry");
            continue;
        };
        let geometry = geo::Geometry::<f64>::try_from(geometry)
            .map_err(|e| Error::GeometryError(e.to_string()))?;

        match geometry {
            geo::Geometry::LineString(polyline) => edges.push(EdgeGeometry { id, polyline }),
            geo::Geometry::MultiLineString(lines) => {
                for (part, polyline) in lines.into_iter().enumerate() {
                    edges.push(EdgeGeometry {
                        id: format!("{id}#{part}"),
                        polyline,
                    });
                }
            }
            other => {
                warn!(
                    "Skipping feature {id}: unsupported geometry with {} coordinates",
                    other.coords_count()
                );
            }
        }
    }

    Ok(NetworkGeometry::new(None, edges))
}

/// Loads a geometry asset from disk, choosing the parser by file extension
/// (`.geojson` for `GeoJSON`, anything else for the JSON asset format).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_network(path: &Path) -> Result<NetworkGeometry, Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open network file '{}': {}", path.display(), e),
        )
    })?;
    let mut contents = String::new();
    BufReader::new(file).read_to_string(&mut contents)?;

    let is_geojson = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson"));

    if is_geojson {
        network_from_geojson_str(&contents)
    } else {
        network_from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET: &str = r#"{
        "bbox_xy": [0, 0, 100, 50],
        "edges": [
            {"id": "A-B", "coords": [[0, 0], [50, 0], [100, 50]]},
            {"id": "B-C", "coords": [[10, 10], [20, 20]]}
        ]
    }"#;

    #[test]
    fn parses_json_asset() {
        let network = network_from_json_str(ASSET).unwrap();
        assert_eq!(network.len(), 2);
        let bbox = network.bbox.unwrap();
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(network.edge("A-B").unwrap().polyline.0.len(), 3);
    }

    #[test]
    fn missing_bbox_is_derived() {
        let network =
            network_from_json_str(r#"{"edges":[{"id":"x","coords":[[2,3],[4,9]]}]}"#).unwrap();
        let bbox = network.bbox.unwrap();
        assert_eq!(bbox.min(), Coord { x: 2.0, y: 3.0 });
        assert_eq!(bbox.max(), Coord { x: 4.0, y: 9.0 });
    }

    #[test]
    fn inverted_bbox_is_rejected() {
        let err = network_from_json_str(r#"{"bbox_xy":[10,0,0,10],"edges":[]}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn asset_survives_reserialization() {
        let network = network_from_json_str(ASSET).unwrap();
        let asset = NetworkAsset::from(&network);
        assert_eq!(asset.bbox_xy, Some([0.0, 0.0, 100.0, 50.0]));
        assert_eq!(asset.edges[0].coords, vec![[0.0, 0.0], [50.0, 0.0], [100.0, 50.0]]);
    }

    #[test]
    fn parses_geojson_lines() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"id": "A-B"},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [10, 5]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiLineString", "coordinates": [[[1, 1], [2, 2]], [[3, 3], [4, 4]]]}},
                {"type": "Feature", "properties": {"id": "stop"},
                 "geometry": {"type": "Point", "coordinates": [5, 5]}}
            ]
        }"#;
        let network = network_from_geojson_str(json).unwrap();
        let ids: Vec<_> = network.edges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A-B", "1#0", "1#1"]);
        assert!(network.bbox.is_some());
    }
}
