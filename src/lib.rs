//! Areamap - administrative-boundary drill-down with spatial filtering
//!
//! This library provides the drill-down state machine, the boundary and
//! point-in-polygon service clients, and the map rendering adapter shared by
//! the explore and serve binaries.

pub mod boundary;
pub mod config;
pub mod drill;
pub mod error;
pub mod filter;
pub mod models;
pub mod pip;
pub mod render;

pub use drill::{DrillSession, DrillState};
pub use error::{AreaError, ServiceError};
pub use models::{AdminLevel, BoundaryFeatureCollection, Organization, SpatialEntity};
