//! Spatial filtering of entities by administrative area.
//!
//! Containment is decided by a remote point-in-polygon service; this module
//! only batches the candidate coordinates and maps the answer back.

mod client;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{AreaError, ServiceError};
use crate::models::SpatialEntity;

pub use client::{
    FilterData, FilterVariables, GraphQlError, GraphQlFilterService, GraphQlRequest, GraphQlResponse,
    FILTER_QUERY,
};

/// Coordinates closer than this are treated as the same point when a
/// result carries no identifier.
pub const COORDINATE_EPSILON: f64 = 1e-6;

/// One point sent to (and returned by) the filter service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Remote point-in-polygon service
#[async_trait]
pub trait AreaFilterService: Send + Sync {
    /// Return the subset of `coordinates` inside the area `area_id`
    async fn filter_coordinates(
        &self,
        coordinates: &[CoordinateInput],
        area_id: &str,
    ) -> Result<Vec<CoordinateInput>, ServiceError>;
}

/// Filters entity lists through an [`AreaFilterService`] with a call timeout
#[derive(Clone)]
pub struct SpatialFilter {
    service: Arc<dyn AreaFilterService>,
    timeout: Duration,
}

impl SpatialFilter {
    pub fn new(service: Arc<dyn AreaFilterService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Entities located inside `area_id`, in input order.
    ///
    /// Entities missing a coordinate never take part. No remote call is made
    /// when no entity has both coordinates. Failures are logged and yield an
    /// empty result.
    pub async fn filter_entities_by_area<E>(&self, entities: &[E], area_id: &str) -> Vec<E>
    where
        E: SpatialEntity + Clone,
    {
        let coordinates: Vec<CoordinateInput> = entities
            .iter()
            .filter_map(|e| {
                let (lat, lng) = e.position()?;
                Some(CoordinateInput {
                    id: Some(e.id().to_string()),
                    lat,
                    lon: lng,
                })
            })
            .collect();

        if coordinates.is_empty() {
            debug!("No entities with coordinates to filter for {}", area_id);
            return Vec::new();
        }

        let call = self.service.filter_coordinates(&coordinates, area_id);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.timeout)),
        };

        match result {
            Ok(matched) => {
                let filtered = match_back(entities, &matched);
                info!(
                    "{} of {} candidates inside {}",
                    filtered.len(),
                    coordinates.len(),
                    area_id
                );
                filtered
            }
            Err(source) => {
                let err = AreaError::SpatialFilter {
                    area: area_id.to_string(),
                    source,
                };
                error!("{}", err.report());
                Vec::new()
            }
        }
    }
}

/// Map service results back onto entities, by id where the result has one
/// and by coordinate equality otherwise.
fn match_back<E>(entities: &[E], matched: &[CoordinateInput]) -> Vec<E>
where
    E: SpatialEntity + Clone,
{
    let ids: HashSet<&str> = matched.iter().filter_map(|c| c.id.as_deref()).collect();
    let anonymous: Vec<&CoordinateInput> = matched.iter().filter(|c| c.id.is_none()).collect();

    entities
        .iter()
        .filter(|e| {
            let Some((lat, lng)) = e.position() else {
                return false;
            };
            ids.contains(e.id())
                || anonymous.iter().any(|c| {
                    (c.lat - lat).abs() < COORDINATE_EPSILON
                        && (c.lon - lng).abs() < COORDINATE_EPSILON
                })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Organization;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers with a fixed set of ids and records every call
    #[derive(Default)]
    pub(crate) struct StubFilter {
        pub inside: Vec<String>,
        pub fail: bool,
        pub strip_ids: bool,
        pub calls: AtomicUsize,
        pub areas: Mutex<Vec<String>>,
    }

    impl StubFilter {
        pub(crate) fn inside(ids: &[&str]) -> Self {
            Self {
                inside: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AreaFilterService for StubFilter {
        async fn filter_coordinates(
            &self,
            coordinates: &[CoordinateInput],
            area_id: &str,
        ) -> Result<Vec<CoordinateInput>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.areas.lock().unwrap().push(area_id.to_string());
            if self.fail {
                return Err(ServiceError::GraphQl("boundary not found".into()));
            }
            Ok(coordinates
                .iter()
                .filter(|c| c.id.as_ref().is_some_and(|id| self.inside.contains(id)))
                .map(|c| CoordinateInput {
                    id: if self.strip_ids { None } else { c.id.clone() },
                    ..c.clone()
                })
                .collect())
        }
    }

    fn orgs() -> Vec<Organization> {
        vec![
            Organization::new("a", "Alpha").at(1.0, 2.0),
            Organization::new("b", "Beta").at(3.0, 4.0),
        ]
    }

    fn filter(stub: &Arc<StubFilter>) -> SpatialFilter {
        SpatialFilter::new(stub.clone(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_empty_input_skips_remote_call() {
        let stub = Arc::new(StubFilter::inside(&["a"]));
        let none: Vec<Organization> = vec![];
        assert!(filter(&stub).filter_entities_by_area(&none, "TH").await.is_empty());

        let no_coords = vec![Organization::new("x", "X"), {
            let mut o = Organization::new("y", "Y");
            o.lat = Some(1.0);
            o
        }];
        assert!(filter(&stub)
            .filter_entities_by_area(&no_coords, "TH")
            .await
            .is_empty());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_maps_back_by_id() {
        let stub = Arc::new(StubFilter::inside(&["a"]));
        let result = filter(&stub).filter_entities_by_area(&orgs(), "TH-10").await;
        assert_eq!(result, vec![orgs()[0].clone()]);
        assert_eq!(stub.call_count(), 1);
        assert_eq!(*stub.areas.lock().unwrap(), vec!["TH-10".to_string()]);
    }

    #[tokio::test]
    async fn test_maps_back_by_coordinates_without_ids() {
        let stub = Arc::new(StubFilter {
            strip_ids: true,
            ..StubFilter::inside(&["b"])
        });
        let result = filter(&stub).filter_entities_by_area(&orgs(), "TH").await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "b");
    }

    #[tokio::test]
    async fn test_failure_yields_empty() {
        let stub = Arc::new(StubFilter {
            fail: true,
            ..StubFilter::inside(&["a", "b"])
        });
        assert!(filter(&stub).filter_entities_by_area(&orgs(), "TH").await.is_empty());
        assert_eq!(stub.call_count(), 1);
    }
}
