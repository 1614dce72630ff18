//! In-process point-in-polygon over a catalog of administrative areas.
//!
//! Backs the reference boundary/filter server.

mod catalog;

pub use catalog::{AreaCatalog, CatalogArea};
