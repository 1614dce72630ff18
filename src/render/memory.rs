//! In-memory [`MapSurface`] that records what is drawn on it.
//!
//! Used headless by the console explorer and as the surface in tests. It can
//! hit-test a coordinate against its sources to synthesize pointer targets.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use geo::{Contains, Point};

use super::surface::{
    Cursor, FeatureFlag, ListenerId, MapSurface, MarkerSpec, PointerKind, PointerTarget,
};
use super::LayerSpec;
use crate::models::{BoundaryFeatureCollection, FeatureId};

/// Markers within this many degrees of a point count as hit
const MARKER_HIT_RADIUS: f64 = 1e-4;

#[derive(Default)]
pub struct MemorySurface {
    sources: HashMap<String, Arc<BoundaryFeatureCollection>>,
    layers: Vec<LayerSpec>,
    states: HashSet<(String, FeatureId, FeatureFlag)>,
    listeners: BTreeMap<ListenerId, (String, PointerKind)>,
    next_listener: ListenerId,
    cursor: Cursor,
    markers: Vec<MarkerSpec>,
}

impl MemorySurface {
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn flag(&self, source: &str, feature: &FeatureId, flag: FeatureFlag) -> bool {
        self.states
            .contains(&(source.to_string(), feature.clone(), flag))
    }

    pub fn markers(&self) -> &[MarkerSpec] {
        &self.markers
    }

    pub fn marker_ids(&self) -> Vec<&str> {
        self.markers.iter().map(|m| m.id.as_str()).collect()
    }

    /// What a pointer at `(lon, lat)` is over: a marker first, then the
    /// topmost listened-to layer with a feature containing the point.
    pub fn hit_test(&self, lon: f64, lat: f64) -> PointerTarget {
        if let Some(marker) = self.markers.iter().find(|m| {
            (m.lng - lon).abs() < MARKER_HIT_RADIUS && (m.lat - lat).abs() < MARKER_HIT_RADIUS
        }) {
            return PointerTarget::Marker(marker.id.clone());
        }

        let point = Point::new(lon, lat);
        for layer in self.layers.iter().rev() {
            let listened = self.listeners.values().any(|(l, _)| *l == layer.id);
            if !listened {
                continue;
            }
            let Some(data) = self.sources.get(&layer.source) else {
                continue;
            };
            if let Some(feature) = data.features.iter().find(|f| f.geometry.contains(&point)) {
                return PointerTarget::Layer {
                    layer: layer.id.clone(),
                    feature: Some(feature.id.clone()),
                };
            }
        }
        PointerTarget::Background
    }
}

impl MapSurface for MemorySurface {
    fn add_source(&mut self, id: &str, data: Arc<BoundaryFeatureCollection>) {
        self.sources.insert(id.to_string(), data);
    }

    fn remove_source(&mut self, id: &str) {
        self.sources.remove(id);
        self.states.retain(|(source, _, _)| source != id);
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_layer(&mut self, layer: &LayerSpec) {
        self.layers.retain(|l| l.id != layer.id);
        self.layers.push(layer.clone());
    }

    fn remove_layer(&mut self, id: &str) {
        self.layers.retain(|l| l.id != id);
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn set_feature_state(&mut self, source: &str, feature: &FeatureId, flag: FeatureFlag, on: bool) {
        let key = (source.to_string(), feature.clone(), flag);
        if on {
            self.states.insert(key);
        } else {
            self.states.remove(&key);
        }
    }

    fn on(&mut self, layer: &str, kind: PointerKind) -> ListenerId {
        self.next_listener += 1;
        self.listeners
            .insert(self.next_listener, (layer.to_string(), kind));
        self.next_listener
    }

    fn off(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    fn add_marker(&mut self, marker: &MarkerSpec) {
        self.markers.retain(|m| m.id != marker.id);
        self.markers.push(marker.clone());
    }

    fn remove_marker(&mut self, id: &str) {
        self.markers.retain(|m| m.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundaryFeature;
    use crate::render::{LayerPaint, FeatureCase};
    use geo::{polygon, MultiPolygon};

    #[test]
    fn test_hit_test() {
        let mut surface = MemorySurface::default();
        let square: MultiPolygon<f64> = MultiPolygon(vec![polygon![
            (x: 100.0, y: 13.0),
            (x: 101.0, y: 13.0),
            (x: 101.0, y: 14.0),
            (x: 100.0, y: 14.0),
        ]]);
        surface.add_source(
            "src",
            Arc::new(BoundaryFeatureCollection::new(vec![BoundaryFeature {
                id: FeatureId::Number(1),
                name: "Bangkok".into(),
                code: "TH-10".into(),
                geometry: square,
                properties: Default::default(),
            }])),
        );
        surface.add_layer(&LayerSpec {
            id: "src-fill".into(),
            source: "src".into(),
            paint: LayerPaint::Fill {
                color: "#000".into(),
                opacity: FeatureCase {
                    selected: 1.0,
                    hover: 1.0,
                    otherwise: 1.0,
                },
            },
        });

        // Layers without listeners are not interactive
        assert_eq!(surface.hit_test(100.5, 13.5), PointerTarget::Background);

        surface.on("src-fill", PointerKind::Click);
        assert_eq!(
            surface.hit_test(100.5, 13.5),
            PointerTarget::Layer {
                layer: "src-fill".into(),
                feature: Some(FeatureId::Number(1))
            }
        );
        assert_eq!(surface.hit_test(0.0, 0.0), PointerTarget::Background);

        surface.add_marker(&MarkerSpec {
            id: "org".into(),
            lat: 13.5,
            lng: 100.5,
            color: "#FF0000",
        });
        assert_eq!(surface.hit_test(100.5, 13.5), PointerTarget::Marker("org".into()));
    }
}
