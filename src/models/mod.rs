//! Core data models for area drill-down.

pub mod boundary;
pub mod entity;
pub mod level;

pub use boundary::{BoundaryFeature, BoundaryFeatureCollection, FeatureId, UNKNOWN_AREA};
pub use entity::{Organization, SpatialEntity};
pub use level::{AdminLevel, LevelDescriptor, LevelStyle, MAX_LEVEL};
