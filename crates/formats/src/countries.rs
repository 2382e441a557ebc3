//! Lenient GeoJSON reader for country label datasets.
//!
//! Only the collection envelope is strict. Individual features keep whatever
//! parsed cleanly and leave the rest as `None`; deciding which features are
//! usable is the label builder's job.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CollectionError;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

pub type Ring = Vec<GeoPoint>;

/// Rings of one polygon; the first ring is the outer boundary.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CountryFeature {
    pub name: Option<String>,
    /// Preferred label anchor (`properties.label_x` / `label_y`).
    pub label_anchor: Option<GeoPoint>,
    /// `None` when the geometry is missing, unsupported, or not an array of rings.
    pub polygons: Option<Vec<Polygon>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CountryCollection {
    pub features: Vec<CountryFeature>,
}

/// Property keys tried, in order, for the display name.
const NAME_KEYS: [&str; 3] = ["name", "NAME", "ADMIN"];

impl CountryCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, CollectionError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, CollectionError> {
        let obj = value
            .as_object()
            .ok_or(CollectionError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(CollectionError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(CollectionError::NotAFeatureCollection)?;

        let features: Vec<CountryFeature> = features_val.iter().map(parse_feature).collect();
        debug!(features = features.len(), "parsed country collection");
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_feature(value: &Value) -> CountryFeature {
    let Some(obj) = value.as_object() else {
        return CountryFeature::default();
    };
    let empty = Map::new();
    let props = obj
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    CountryFeature {
        name: parse_name(props),
        label_anchor: parse_label_anchor(props),
        polygons: obj.get("geometry").and_then(parse_geometry),
    }
}

fn parse_name(props: &Map<String, Value>) -> Option<String> {
    NAME_KEYS
        .iter()
        .filter_map(|k| props.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_label_anchor(props: &Map<String, Value>) -> Option<GeoPoint> {
    let lon = props.get("label_x").and_then(Value::as_f64)?;
    let lat = props.get("label_y").and_then(Value::as_f64)?;
    Some(GeoPoint::new(lon, lat))
}

fn parse_geometry(value: &Value) -> Option<Vec<Polygon>> {
    let obj = value.as_object()?;
    let coords = obj.get("coordinates")?;
    match obj.get("type").and_then(Value::as_str)? {
        "Polygon" => Some(vec![parse_polygon(coords)?]),
        "MultiPolygon" => {
            let polys = coords.as_array()?;
            Some(polys.iter().filter_map(parse_polygon).collect())
        }
        _ => None,
    }
}

/// Non-array rings are dropped; points that are not `[lon, lat, ..]` numbers are dropped.
fn parse_polygon(coords: &Value) -> Option<Polygon> {
    let rings = coords.as_array()?;
    Some(
        rings
            .iter()
            .filter_map(Value::as_array)
            .map(|ring| ring.iter().filter_map(parse_point).collect())
            .collect(),
    )
}

fn parse_point(value: &Value) -> Option<GeoPoint> {
    let arr = value.as_array()?;
    let lon = arr.first()?.as_f64()?;
    let lat = arr.get(1)?.as_f64()?;
    Some(GeoPoint::new(lon, lat))
}

#[cfg(test)]
mod tests {
    use super::{CountryCollection, GeoPoint};
    use crate::error::CollectionError;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_polygon_and_multipolygon_features() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "properties": {"name": "Squareland", "label_x": 1.0, "label_y": 2.0},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}},
                {"type": "Feature",
                 "properties": {"NAME": "Islands", "label_x": -10.5, "label_y": 5},
                 "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[-11,4],[-10,4],[-10,5],[-11,4]]],
                    [[[-12,6],[-11,6],[-11,7],[-12,6]]]
                 ]}}
            ]
        }"#;
        let c = CountryCollection::from_geojson_str(payload).expect("parse");
        assert_eq!(c.len(), 2);

        let square = &c.features[0];
        assert_eq!(square.name.as_deref(), Some("Squareland"));
        assert_eq!(square.label_anchor, Some(GeoPoint::new(1.0, 2.0)));
        let polys = square.polygons.as_ref().expect("polygons");
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0][0].len(), 5);

        let islands = &c.features[1];
        assert_eq!(islands.name.as_deref(), Some("Islands"));
        assert_eq!(islands.polygons.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn malformed_features_keep_partial_fields() {
        let payload = r#"{
            "type": "FeatureCollection",
            "features": [
                42,
                {"type": "Feature", "properties": {"name": "  "}, "geometry": null},
                {"type": "Feature", "properties": {"name": "NoAnchor", "label_x": "12"},
                 "geometry": {"type": "Polygon", "coordinates": "oops"}},
                {"type": "Feature", "properties": {"name": "Line"},
                 "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}},
                {"type": "Feature", "properties": {"name": "BadRing", "label_x": 0, "label_y": 0},
                 "geometry": {"type": "Polygon", "coordinates": [7, [[0,0],["x",1],[2,2]]]}}
            ]
        }"#;
        let c = CountryCollection::from_geojson_str(payload).expect("parse");
        assert_eq!(c.len(), 5);
        assert_eq!(c.features[0].name, None);
        assert_eq!(c.features[1].name, None);
        assert_eq!(c.features[2].label_anchor, None);
        assert_eq!(c.features[2].polygons, None);
        assert_eq!(c.features[3].polygons, None);

        let bad_ring = c.features[4].polygons.as_ref().expect("polygons");
        assert_eq!(
            bad_ring,
            &vec![vec![vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(2.0, 2.0)]]]
        );
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            CountryCollection::from_geojson_str(r#"{"type": "Feature"}"#),
            Err(CollectionError::NotAFeatureCollection)
        ));
        assert!(matches!(
            CountryCollection::from_geojson_str("not json"),
            Err(CollectionError::Json(_))
        ));
    }
}
