use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{json, Map};

use super::views::{MapMarker, MapView};

fn marker_feature(marker: &MapMarker) -> Feature {
    let mut properties = Map::new();
    properties.insert("locality".to_owned(), json!(marker.locality));
    properties.insert("value".to_owned(), json!(marker.value));
    properties.insert("display".to_owned(), json!(marker.display));
    properties.insert("radius".to_owned(), json!(marker.radius));
    properties.insert("color".to_owned(), json!(marker.color));
    properties.insert("popup".to_owned(), json!(marker.popup));
    properties.insert("tooltip".to_owned(), json!(marker.tooltip));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![marker.longitude, marker.latitude]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Map layer as a GeoJSON FeatureCollection; an empty map has no features.
pub fn to_geojson(view: &MapView) -> GeoJson {
    let features = match view {
        MapView::Markers { markers, .. } => markers.iter().map(marker_feature).collect(),
        MapView::Empty { .. } => Vec::new(),
    };

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
