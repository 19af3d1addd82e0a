//! This module is responsible for loading the static network geometry
//! asset used by the map view.

mod network;

pub use network::{
    AssetEdge, NetworkAsset, load_network, network_from_geojson_str, network_from_json_str,
};
