//! Reconciles desired boundary layers onto a [`MapSurface`] and translates
//! pointer events on them into map events.

use tracing::debug;

use super::surface::{
    Cursor, FeatureFlag, ListenerId, MapSurface, MarkerSpec, PointerEvent, PointerKind,
    PointerTarget,
};
use super::LayerSet;
use crate::models::{FeatureId, SpatialEntity, UNKNOWN_AREA};

/// Color of the markers placed for filtered entities
pub const MARKER_COLOR: &str = "#FF0000";

/// What a pointer event means for the drill-down
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    HoverChanged(String),
    HoverCleared,
    AreaClicked { code: String, name: String },
    /// A click on the map background
    ZoomOutRequested,
    MarkerClicked(String),
}

struct Mounted {
    set: LayerSet,
    listeners: Vec<(PointerKind, ListenerId)>,
    hovered: Option<FeatureId>,
}

impl Mounted {
    fn listens(&self, layer: &str, kind: PointerKind) -> bool {
        layer == self.set.fill.id && self.listeners.iter().any(|(k, _)| *k == kind)
    }
}

/// Owns the surface handle for as long as boundary layers may be on it.
///
/// Dropping the adapter removes its layers, source, listeners and markers.
pub struct BoundaryLayer<S: MapSurface> {
    surface: S,
    mounted: Option<Mounted>,
    markers: Vec<String>,
}

impl<S: MapSurface> BoundaryLayer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            mounted: None,
            markers: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn mounted(&self) -> Option<&LayerSet> {
        self.mounted.as_ref().map(|m| &m.set)
    }

    /// Bring the surface in line with `desired`.
    ///
    /// `None` means no collection is available and leaves whatever is drawn in
    /// place. Any change replaces source, layers and listeners wholesale.
    /// Returns true when the surface was touched.
    pub fn reconcile(&mut self, desired: Option<LayerSet>) -> bool {
        let Some(desired) = desired else {
            return false;
        };
        if self.mounted.as_ref().is_some_and(|m| m.set == desired) {
            return false;
        }

        self.unmount();
        if desired.data.is_empty() {
            debug!("Nothing to draw for {}", desired.source_id);
            return true;
        }

        let surface = &mut self.surface;
        surface.add_source(&desired.source_id, desired.data.clone());
        surface.add_layer(&desired.fill);
        surface.add_layer(&desired.outline);

        let listeners = PointerKind::ALL
            .iter()
            .map(|kind| (*kind, surface.on(&desired.fill.id, *kind)))
            .collect();

        if let Some(selected) = &desired.selected_feature {
            surface.set_feature_state(&desired.source_id, selected, FeatureFlag::Selected, true);
        }

        debug!(
            "Mounted {} with {} features",
            desired.source_id,
            desired.data.len()
        );
        self.mounted = Some(Mounted {
            set: desired,
            listeners,
            hovered: None,
        });
        true
    }

    /// Remove listeners, both layers and the source
    pub fn unmount(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        let surface = &mut self.surface;

        for (_, listener) in mounted.listeners {
            surface.off(listener);
        }
        if mounted.hovered.is_some() {
            surface.set_cursor(Cursor::Default);
        }
        for layer in [&mounted.set.fill.id, &mounted.set.outline.id] {
            if surface.has_layer(layer) {
                surface.remove_layer(layer);
            }
        }
        if surface.has_source(&mounted.set.source_id) {
            surface.remove_source(&mounted.set.source_id);
        }
    }

    /// Place one marker per entity with coordinates, removing all previous ones
    pub fn sync_markers<E: SpatialEntity>(&mut self, entities: &[E]) {
        self.clear_markers();
        for entity in entities {
            let Some((lat, lng)) = entity.position() else {
                continue;
            };
            let marker = MarkerSpec {
                id: entity.id().to_string(),
                lat,
                lng,
                color: MARKER_COLOR,
            };
            self.surface.add_marker(&marker);
            self.markers.push(marker.id);
        }
    }

    fn clear_markers(&mut self) {
        for id in self.markers.drain(..) {
            self.surface.remove_marker(&id);
        }
    }

    /// Translate one pointer event. Returns at most one map event.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<MapEvent> {
        match (&event.target, event.kind) {
            (PointerTarget::Background, PointerKind::Click) => Some(MapEvent::ZoomOutRequested),
            (PointerTarget::Marker(id), PointerKind::Click) => {
                Some(MapEvent::MarkerClicked(id.clone()))
            }
            (PointerTarget::Layer { layer, feature }, kind) => {
                let mounted = self.mounted.as_mut()?;
                if !mounted.listens(layer, kind) {
                    return None;
                }
                let surface = &mut self.surface;
                let source = &mounted.set.source_id;

                match kind {
                    PointerKind::Enter => {
                        surface.set_cursor(Cursor::Pointer);
                        None
                    }
                    PointerKind::Leave => {
                        surface.set_cursor(Cursor::Default);
                        if let Some(previous) = mounted.hovered.take() {
                            surface.set_feature_state(source, &previous, FeatureFlag::Hover, false);
                        }
                        Some(MapEvent::HoverCleared)
                    }
                    PointerKind::Move => {
                        let feature = feature.as_ref()?;
                        if mounted.hovered.as_ref() == Some(feature) {
                            return None;
                        }
                        if let Some(previous) = mounted.hovered.take() {
                            surface.set_feature_state(source, &previous, FeatureFlag::Hover, false);
                        }
                        surface.set_feature_state(source, feature, FeatureFlag::Hover, true);
                        mounted.hovered = Some(feature.clone());

                        let name = mounted
                            .set
                            .data
                            .find_by_id(feature)
                            .map(|f| f.name.clone())
                            .unwrap_or_else(|| UNKNOWN_AREA.to_string());
                        Some(MapEvent::HoverChanged(name))
                    }
                    PointerKind::Click => {
                        let hit = mounted.set.data.find_by_id(feature.as_ref()?)?;
                        Some(MapEvent::AreaClicked {
                            code: hit.code.clone(),
                            name: hit.name.clone(),
                        })
                    }
                }
            }
            _ => None,
        }
    }
}

impl<S: MapSurface> Drop for BoundaryLayer<S> {
    fn drop(&mut self) {
        self.unmount();
        self.clear_markers();
    }
}
