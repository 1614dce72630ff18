//! Boundary rendering adapter.
//!
//! [`LayerSet`] describes what should be on the map for a drill-down state;
//! [`BoundaryLayer`] reconciles that onto a [`MapSurface`] and turns pointer
//! events into [`MapEvent`]s.

mod adapter;
mod layers;
mod memory;
mod surface;

pub use adapter::{BoundaryLayer, MapEvent, MARKER_COLOR};
pub use layers::{
    FeatureCase, LayerPaint, LayerSet, LayerSpec, DEFAULT_LAYER_ID, SELECTED_LINE_COLOR,
};
pub use memory::MemorySurface;
pub use surface::{
    Cursor, FeatureFlag, ListenerId, MapSurface, MarkerSpec, PointerEvent, PointerKind,
    PointerTarget,
};
