//! Boundary feature collections as exchanged with the boundary service.

use std::collections::HashSet;

use geo_types::MultiPolygon;
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GeoJsonError;

/// Name shown for features that carry none
pub const UNKNOWN_AREA: &str = "Unknown Area";

/// Stable per-feature identifier used for feature-state assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::Text(s) => f.write_str(s),
        }
    }
}

/// One named administrative area
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub id: FeatureId,
    pub name: String,
    /// Area identifier used for filtering and for requesting child boundaries
    pub code: String,
    pub geometry: MultiPolygon<f64>,
    /// Remaining GeoJSON properties, kept verbatim
    pub properties: Map<String, Value>,
}

impl BoundaryFeature {
    /// Whether this feature answers to the given area code
    pub fn matches_code(&self, code: &str) -> bool {
        if self.code == code {
            return true;
        }
        ["isoCode", "id"]
            .iter()
            .filter_map(|key| self.properties.get(*key))
            .any(|v| property_as_string(v).as_deref() == Some(code))
    }

    fn to_geojson(&self) -> geojson::Feature {
        let id = match &self.id {
            FeatureId::Number(n) => geojson::feature::Id::Number((*n).into()),
            FeatureId::Text(s) => geojson::feature::Id::String(s.clone()),
        };
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: Some(id),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }
}

/// All boundaries of one administrative level (optionally under one parent)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryFeatureCollection {
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryFeatureCollection {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&BoundaryFeature> {
        self.features.iter().find(|f| f.matches_code(code))
    }

    pub fn find_by_id(&self, id: &FeatureId) -> Option<&BoundaryFeature> {
        self.features.iter().find(|f| &f.id == id)
    }

    pub fn from_json_str(json: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_geojson(&value)
    }

    /// Parse a GeoJSON FeatureCollection.
    ///
    /// Features whose geometry is missing or not polygonal are skipped;
    /// malformed features are rejected. A feature's code is
    /// `properties.isoCode`, then `properties.id`, then the feature id.
    /// When any feature lacks an id or two features share one, every feature
    /// is re-numbered by position so ids stay unique within the collection.
    pub fn from_geojson(value: &Value) -> Result<Self, GeoJsonError> {
        if value["type"].as_str() != Some("FeatureCollection") {
            return Err(GeoJsonError::NotACollection);
        }
        let raw = value["features"]
            .as_array()
            .ok_or(GeoJsonError::NotACollection)?;

        let mut features = Vec::with_capacity(raw.len());
        let mut explicit_ids = Vec::with_capacity(raw.len());
        for (index, raw_feature) in raw.iter().enumerate() {
            let invalid = |reason: String| GeoJsonError::Feature { index, reason };

            let feature = geojson::Feature::try_from(raw_feature.clone())
                .map_err(|e| invalid(e.to_string()))?;

            let Some(geometry) = feature.geometry else {
                debug!("Skipping feature {} without geometry", index);
                continue;
            };
            let geometry = match geo_types::Geometry::<f64>::try_from(geometry)
                .map_err(|e| invalid(e.to_string()))?
            {
                geo_types::Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
                geo_types::Geometry::MultiPolygon(mp) => mp,
                _ => {
                    debug!("Skipping feature {} without polygon geometry", index);
                    continue;
                }
            };
            if let Some(reason) = degenerate(&geometry) {
                return Err(invalid(reason.to_string()));
            }

            let id = match feature.id {
                None => None,
                Some(geojson::feature::Id::String(s)) => Some(FeatureId::Text(s)),
                Some(geojson::feature::Id::Number(n)) => match n.as_u64() {
                    Some(n) => Some(FeatureId::Number(n)),
                    None => return Err(invalid(format!("bad id: {n}"))),
                },
            };

            let properties = feature.properties.unwrap_or_default();

            let name = properties
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_AREA)
                .to_string();

            let position = features.len();
            let code = properties
                .get("isoCode")
                .and_then(property_as_string)
                .or_else(|| properties.get("id").and_then(property_as_string))
                .or_else(|| id.as_ref().map(FeatureId::to_string))
                .unwrap_or_else(|| position.to_string());

            features.push(BoundaryFeature {
                id: FeatureId::Number(position as u64),
                name,
                code,
                geometry,
                properties,
            });
            explicit_ids.push(id);
        }

        let mut seen = HashSet::with_capacity(explicit_ids.len());
        let unique = explicit_ids
            .iter()
            .all(|id| id.as_ref().is_some_and(|id| seen.insert(id.clone())));
        if unique {
            for (feature, id) in features.iter_mut().zip(explicit_ids) {
                if let Some(id) = id {
                    feature.id = id;
                }
            }
        } else if !features.is_empty() {
            debug!("Feature ids missing or repeated, numbering {} features", features.len());
        }

        Ok(Self { features })
    }

    pub fn to_geojson(&self) -> Value {
        let collection = geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(BoundaryFeature::to_geojson).collect(),
            foreign_members: None,
        };
        GeoJson::FeatureCollection(collection).to_json_value()
    }
}

fn property_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rings need at least three distinct vertices plus the closing one
fn degenerate(geometry: &MultiPolygon<f64>) -> Option<&'static str> {
    if geometry.0.is_empty() {
        return Some("multipolygon has no polygons");
    }
    geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .any(|ring| ring.0.len() < 4)
        .then_some("ring has fewer than three vertices")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(id: Option<Value>, props: Value, ring: Value) -> Value {
        let mut feature = json!({
            "type": "Feature",
            "properties": props,
            "geometry": {"type": "Polygon", "coordinates": [ring]}
        });
        if let Some(id) = id {
            feature["id"] = id;
        }
        feature
    }

    fn square(id: Option<Value>, props: Value) -> Value {
        feature(
            id,
            props,
            json!([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]),
        )
    }

    fn collection(features: Vec<Value>) -> Value {
        json!({"type": "FeatureCollection", "features": features})
    }

    #[test]
    fn test_parse_codes_and_ids() {
        let fc = collection(vec![
            square(Some(json!(7)), json!({"name": "Thailand", "isoCode": "TH"})),
            square(Some(json!(8)), json!({"name": "Bangkok", "id": "TH-10"})),
            square(Some(json!("x")), json!({})),
            json!({"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [0, 0]}}),
        ]);

        let collection = BoundaryFeatureCollection::from_geojson(&fc).unwrap();
        assert_eq!(collection.len(), 3);

        assert_eq!(collection.features[0].id, FeatureId::Number(7));
        assert_eq!(collection.features[0].code, "TH");

        assert_eq!(collection.features[1].id, FeatureId::Number(8));
        assert_eq!(collection.features[1].code, "TH-10");

        assert_eq!(collection.features[2].id, FeatureId::Text("x".into()));
        assert_eq!(collection.features[2].name, UNKNOWN_AREA);
        assert_eq!(collection.features[2].code, "x");

        assert!(collection.find_by_code("TH-10").is_some());
    }

    #[test]
    fn test_missing_ids_never_collide_with_explicit_ones() {
        let fc = collection(vec![
            square(Some(json!(1)), json!({"name": "Alpha", "isoCode": "AA"})),
            square(None, json!({"name": "Beta", "isoCode": "BB"})),
        ]);

        let collection = BoundaryFeatureCollection::from_geojson(&fc).unwrap();
        let ids: Vec<_> = collection.features.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec![FeatureId::Number(0), FeatureId::Number(1)]);

        let beta = collection.find_by_id(&FeatureId::Number(1)).unwrap();
        assert_eq!(beta.code, "BB");
        assert_eq!(beta.name, "Beta");
    }

    #[test]
    fn test_repeated_ids_are_renumbered() {
        let fc = collection(vec![
            square(Some(json!("dup")), json!({"isoCode": "AA"})),
            square(Some(json!("dup")), json!({"isoCode": "BB"})),
        ]);

        let collection = BoundaryFeatureCollection::from_geojson(&fc).unwrap();
        assert_eq!(collection.find_by_id(&FeatureId::Number(1)).unwrap().code, "BB");
        assert!(collection.find_by_id(&FeatureId::Text("dup".into())).is_none());
    }

    #[test]
    fn test_rejects_malformed_vertex() {
        let fc = collection(vec![
            square(Some(json!(1)), json!({"isoCode": "AA"})),
            feature(
                Some(json!(2)),
                json!({"isoCode": "BB"}),
                json!([[0, 0], [10, 0], ["x", 10], [0, 10], [0, 0]]),
            ),
        ]);

        let err = BoundaryFeatureCollection::from_geojson(&fc).unwrap_err();
        assert!(matches!(err, GeoJsonError::Feature { index: 1, .. }));
    }

    #[test]
    fn test_rejects_degenerate_ring() {
        let fc = collection(vec![feature(
            Some(json!(1)),
            json!({"isoCode": "AA"}),
            json!([[0, 0], [10, 0]]),
        )]);

        let err = BoundaryFeatureCollection::from_geojson(&fc).unwrap_err();
        assert!(matches!(err, GeoJsonError::Feature { index: 0, .. }));
    }

    #[test]
    fn test_rejects_non_collection() {
        let err = BoundaryFeatureCollection::from_json_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotACollection));
    }

    #[test]
    fn test_geojson_output_parses_back() {
        let fc = collection(vec![square(
            Some(json!(1)),
            json!({"name": "A", "isoCode": "AA"}),
        )]);
        let collection = BoundaryFeatureCollection::from_geojson(&fc).unwrap();
        let output = collection.to_geojson();
        assert_eq!(output["features"][0]["geometry"]["type"], "MultiPolygon");
        let again = BoundaryFeatureCollection::from_geojson(&output).unwrap();
        assert_eq!(collection, again);
    }
}
