//! The map surface the boundary layers are drawn on.

use std::sync::Arc;

use super::LayerSpec;
use crate::models::{BoundaryFeatureCollection, FeatureId};

pub type ListenerId = u64;

/// Pointer interactions a surface reports for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Enter,
    Leave,
    Move,
    Click,
}

impl PointerKind {
    pub const ALL: [PointerKind; 4] = [
        PointerKind::Enter,
        PointerKind::Leave,
        PointerKind::Move,
        PointerKind::Click,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
}

/// Per-feature flags paint expressions can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureFlag {
    Hover,
    Selected,
}

/// A point marker placed on the map
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub color: &'static str,
}

/// What the pointer was over when an event fired
#[derive(Debug, Clone, PartialEq)]
pub enum PointerTarget {
    Layer {
        layer: String,
        feature: Option<FeatureId>,
    },
    Marker(String),
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub target: PointerTarget,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, target: PointerTarget) -> Self {
        Self { kind, target }
    }
}

/// Rendering surface capable of drawing vector layers and placing markers
pub trait MapSurface {
    fn add_source(&mut self, id: &str, data: Arc<BoundaryFeatureCollection>);
    fn remove_source(&mut self, id: &str);
    fn has_source(&self, id: &str) -> bool;

    fn add_layer(&mut self, layer: &LayerSpec);
    fn remove_layer(&mut self, id: &str);
    fn has_layer(&self, id: &str) -> bool;

    fn set_feature_state(&mut self, source: &str, feature: &FeatureId, flag: FeatureFlag, on: bool);

    /// Register interest in `kind` events on `layer`
    fn on(&mut self, layer: &str, kind: PointerKind) -> ListenerId;
    fn off(&mut self, listener: ListenerId);

    fn set_cursor(&mut self, cursor: Cursor);

    fn add_marker(&mut self, marker: &MarkerSpec);
    fn remove_marker(&mut self, id: &str);
}

impl<S: MapSurface + ?Sized> MapSurface for &mut S {
    fn add_source(&mut self, id: &str, data: Arc<BoundaryFeatureCollection>) {
        (**self).add_source(id, data)
    }

    fn remove_source(&mut self, id: &str) {
        (**self).remove_source(id)
    }

    fn has_source(&self, id: &str) -> bool {
        (**self).has_source(id)
    }

    fn add_layer(&mut self, layer: &LayerSpec) {
        (**self).add_layer(layer)
    }

    fn remove_layer(&mut self, id: &str) {
        (**self).remove_layer(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        (**self).has_layer(id)
    }

    fn set_feature_state(&mut self, source: &str, feature: &FeatureId, flag: FeatureFlag, on: bool) {
        (**self).set_feature_state(source, feature, flag, on)
    }

    fn on(&mut self, layer: &str, kind: PointerKind) -> ListenerId {
        (**self).on(layer, kind)
    }

    fn off(&mut self, listener: ListenerId) {
        (**self).off(listener)
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        (**self).set_cursor(cursor)
    }

    fn add_marker(&mut self, marker: &MarkerSpec) {
        (**self).add_marker(marker)
    }

    fn remove_marker(&mut self, id: &str) {
        (**self).remove_marker(id)
    }
}
