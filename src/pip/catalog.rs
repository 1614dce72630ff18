//! Catalog of administrative areas answering boundary and containment queries.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use geo::{BoundingRect, Contains, Point, Simplify};
use rstar::{RTree, RTreeObject, AABB};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::filter::CoordinateInput;
use crate::models::{AdminLevel, BoundaryFeature, BoundaryFeatureCollection};

/// One area with its place in the hierarchy
#[derive(Debug, Clone)]
pub struct CatalogArea {
    pub level: AdminLevel,
    pub parent: Option<String>,
    pub feature: BoundaryFeature,
}

/// R-tree entry for one area
#[derive(Clone)]
struct IndexedArea {
    area: Arc<CatalogArea>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedArea {
    fn new(area: Arc<CatalogArea>) -> Option<Self> {
        let rect = area.feature.geometry.bounding_rect()?;
        Some(Self {
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            area,
        })
    }
}

pub struct AreaCatalog {
    areas: Vec<Arc<CatalogArea>>,
    by_code: HashMap<String, Arc<CatalogArea>>,
    tree: RTree<IndexedArea>,
}

impl AreaCatalog {
    /// Build from a collection whose features carry `level` and `parent`
    /// properties. Features with an out-of-range level are skipped.
    pub fn build(collection: BoundaryFeatureCollection) -> Self {
        let mut areas = Vec::with_capacity(collection.len());
        for feature in collection.features {
            let raw_level = feature.properties.get("level").and_then(Value::as_u64).unwrap_or(0);
            let Some(level) = u8::try_from(raw_level).ok().and_then(AdminLevel::new) else {
                warn!("Skipping {} with unsupported level {}", feature.code, raw_level);
                continue;
            };
            let parent = feature
                .properties
                .get("parent")
                .and_then(Value::as_str)
                .map(str::to_string);
            if level.is_top() != parent.is_none() {
                warn!("Skipping {}: parent does not match level {}", feature.code, level);
                continue;
            }
            areas.push(Arc::new(CatalogArea {
                level,
                parent,
                feature,
            }));
        }

        let by_code = areas
            .iter()
            .map(|a| (a.feature.code.clone(), Arc::clone(a)))
            .collect();

        let indexed: Vec<IndexedArea> = areas.iter().cloned().filter_map(IndexedArea::new).collect();
        let tree = RTree::bulk_load(indexed);

        info!("Area catalog built with {} areas", areas.len());
        for level in AdminLevel::all() {
            let count = areas.iter().filter(|a| a.level == level).count();
            if count > 0 {
                info!("  level {}: {} areas", level, count);
            }
        }

        Self {
            areas,
            by_code,
            tree,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let collection = BoundaryFeatureCollection::from_json_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Self::build(collection))
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Arc<CatalogArea>> {
        self.by_code.get(code)
    }

    /// Areas at `level` under `parent`, simplified with `tolerance` when positive
    pub fn boundaries(
        &self,
        level: AdminLevel,
        parent: Option<&str>,
        tolerance: f64,
    ) -> BoundaryFeatureCollection {
        let features = self
            .areas
            .iter()
            .filter(|a| a.level == level && a.parent.as_deref() == parent)
            .map(|a| {
                let mut feature = a.feature.clone();
                if tolerance > 0.0 {
                    feature.geometry = feature.geometry.simplify(tolerance);
                }
                feature
            })
            .collect::<Vec<_>>();
        debug!(
            "Serving {} boundaries for level {} under {:?}",
            features.len(),
            level,
            parent
        );
        BoundaryFeatureCollection::new(features)
    }

    /// All areas containing the point
    pub fn lookup(&self, lon: f64, lat: f64) -> Vec<Arc<CatalogArea>> {
        let point = Point::new(lon, lat);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .filter(|ia| ia.area.feature.geometry.contains(&point))
            .map(|ia| Arc::clone(&ia.area))
            .collect()
    }

    /// Coordinates inside the area `code`, or `None` for an unknown area
    pub fn filter(&self, coordinates: &[CoordinateInput], code: &str) -> Option<Vec<CoordinateInput>> {
        self.get(code)?;
        Some(
            coordinates
                .iter()
                .filter(|c| {
                    self.lookup(c.lon, c.lat)
                        .iter()
                        .any(|a| a.feature.code == code)
                })
                .cloned()
                .collect(),
        )
    }
}
