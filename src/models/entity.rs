//! Geo-tagged records that can be filtered by area.

use serde::{Deserialize, Serialize};

/// Any record with an identifier and an optional position
pub trait SpatialEntity {
    fn id(&self) -> &str;
    fn lat(&self) -> Option<f64>;
    fn lng(&self) -> Option<f64>;

    /// `(lat, lng)` when both coordinates are present
    fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat()?, self.lng()?))
    }
}

/// Organization as returned by the organization API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl Organization {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            address: None,
            lat: None,
            lng: None,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }
}

impl SpatialEntity for Organization {
    fn id(&self) -> &str {
        &self.id
    }

    fn lat(&self) -> Option<f64> {
        self.lat
    }

    fn lng(&self) -> Option<f64> {
        self.lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut org = Organization::new("a", "Alpha");
        assert_eq!(org.position(), None);
        org.lat = Some(13.7);
        assert_eq!(org.position(), None);
        let org = org.at(13.7, 100.5);
        assert_eq!(org.position(), Some((13.7, 100.5)));
    }

    #[test]
    fn test_deserialize_api_shape() {
        let org: Organization =
            serde_json::from_str(r#"{"id":"o1","name":"Org","lat":1.5}"#).unwrap();
        assert_eq!(org.lat, Some(1.5));
        assert_eq!(org.lng, None);
    }
}
