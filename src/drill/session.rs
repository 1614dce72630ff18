//! Runs a drill-down state machine against live services.
//!
//! The session owns the current [`DrillState`] and the futures for every
//! effect it has dispatched. It never spawns: completions are applied on the
//! caller's task through [`DrillSession::next_completion`] or
//! [`DrillSession::settle`].

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::debug;

use super::{DrillEvent, DrillState, Effect, Panel};
use crate::boundary::{fetch_boundaries, BoundaryService};
use crate::filter::SpatialFilter;
use crate::models::{AdminLevel, SpatialEntity};

pub struct DrillSession<E> {
    state: DrillState<E>,
    entities: Arc<[E]>,
    boundaries: Arc<dyn BoundaryService>,
    filter: SpatialFilter,
    timeout: Duration,
    in_flight: FuturesUnordered<BoxFuture<'static, DrillEvent<E>>>,
}

impl<E> DrillSession<E>
where
    E: SpatialEntity + Clone + Send + Sync + 'static,
{
    pub fn new(
        entities: Vec<E>,
        boundaries: Arc<dyn BoundaryService>,
        filter: SpatialFilter,
        timeout: Duration,
        max_level: AdminLevel,
    ) -> Self {
        let step = DrillState::start(max_level);
        let mut session = Self {
            state: step.state,
            entities: entities.into(),
            boundaries,
            filter,
            timeout,
            in_flight: FuturesUnordered::new(),
        };
        session.run_effects(step.effects);
        session
    }

    pub fn state(&self) -> &DrillState<E> {
        &self.state
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn panel(&self) -> Panel {
        Panel::from_state(&self.state)
    }

    /// Number of dispatched effects whose completion has not been applied
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dispatch(&mut self, event: DrillEvent<E>) {
        let step = self.state.apply(event);
        self.state = step.state;
        self.run_effects(step.effects);
    }

    pub fn click_area(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.dispatch(DrillEvent::AreaClicked {
            code: code.into(),
            name: name.into(),
        });
    }

    pub fn zoom_out(&mut self) {
        self.dispatch(DrillEvent::ZoomOut);
    }

    pub fn set_max_level(&mut self, level: i64) {
        self.dispatch(DrillEvent::SetMaxLevel(level));
    }

    pub fn hover(&mut self, name: Option<String>) {
        self.dispatch(match name {
            Some(name) => DrillEvent::HoverChanged(name),
            None => DrillEvent::HoverCleared,
        });
    }

    /// Apply the next completed effect. Returns false when nothing is in flight.
    pub async fn next_completion(&mut self) -> bool {
        match self.in_flight.next().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no effect is in flight
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            debug!("Dispatching {:?}", effect);
            let future = match effect {
                Effect::LoadBoundaries(ticket) => {
                    let service = Arc::clone(&self.boundaries);
                    let timeout = self.timeout;
                    async move {
                        let result = fetch_boundaries(service.as_ref(), &ticket.request, timeout)
                            .await
                            .map(Arc::new);
                        DrillEvent::BoundariesLoaded { ticket, result }
                    }
                    .boxed()
                }
                Effect::Probe {
                    generation,
                    request,
                } => {
                    let service = Arc::clone(&self.boundaries);
                    let timeout = self.timeout;
                    async move {
                        let outcome = fetch_boundaries(service.as_ref(), &request, timeout)
                            .await
                            .map(Arc::new);
                        DrillEvent::ProbeCompleted {
                            generation,
                            request,
                            outcome,
                        }
                    }
                    .boxed()
                }
                Effect::Filter { generation, area } => {
                    let filter = self.filter.clone();
                    let entities = Arc::clone(&self.entities);
                    async move {
                        let entities = filter.filter_entities_by_area(&entities, &area).await;
                        DrillEvent::FilterCompleted {
                            generation,
                            entities,
                        }
                    }
                    .boxed()
                }
            };
            self.in_flight.push(future);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryRequest;
    use crate::error::ServiceError;
    use crate::filter::tests::StubFilter;
    use crate::models::{BoundaryFeature, BoundaryFeatureCollection, FeatureId, Organization};
    use crate::render::{BoundaryLayer, LayerSet, MemorySurface, DEFAULT_LAYER_ID};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Serves fixed child counts per parent and records every request
    #[derive(Default)]
    struct StubBoundaries {
        children: HashMap<String, usize>,
        failing: Vec<String>,
        /// Every request fails while set
        offline: AtomicBool,
        requests: Mutex<Vec<BoundaryRequest>>,
    }

    impl StubBoundaries {
        fn with(children: &[(&str, usize)]) -> Self {
            Self {
                children: children.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                ..Default::default()
            }
        }

        fn probes_for(&self, parent: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.parent.as_deref() == Some(parent))
                .count()
        }
    }

    fn areas(prefix: &str, n: usize) -> BoundaryFeatureCollection {
        BoundaryFeatureCollection::new(
            (0..n)
                .map(|i| BoundaryFeature {
                    id: FeatureId::Number(i as u64),
                    name: format!("{prefix} {i}"),
                    code: format!("{prefix}-{i}"),
                    geometry: geo::MultiPolygon(vec![]),
                    properties: Default::default(),
                })
                .collect(),
        )
    }

    #[async_trait]
    impl BoundaryService for StubBoundaries {
        async fn fetch_boundaries(
            &self,
            request: &BoundaryRequest,
        ) -> Result<BoundaryFeatureCollection, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.offline.load(Ordering::SeqCst) {
                return Err(ServiceError::Timeout(Duration::from_secs(5)));
            }
            match &request.parent {
                None => Ok(areas("C", 3)),
                Some(p) if self.failing.contains(p) => Err(ServiceError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                }),
                Some(p) => Ok(areas(p, self.children.get(p).copied().unwrap_or(0))),
            }
        }
    }

    fn orgs() -> Vec<Organization> {
        vec![
            Organization::new("a", "Alpha").at(13.75, 100.5),
            Organization::new("b", "Beta").at(18.8, 98.9),
            Organization::new("c", "Gamma"),
        ]
    }

    fn session(
        boundaries: &Arc<StubBoundaries>,
        filter: &Arc<StubFilter>,
        max_level: u8,
    ) -> DrillSession<Organization> {
        DrillSession::new(
            orgs(),
            boundaries.clone(),
            SpatialFilter::new(filter.clone(), Duration::from_secs(5)),
            Duration::from_secs(5),
            AdminLevel::new(max_level).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_initial_load() {
        let boundaries = Arc::new(StubBoundaries::default());
        let filter = Arc::new(StubFilter::inside(&[]));
        let mut s = session(&boundaries, &filter, 4);
        assert_eq!(s.pending(), 1);
        s.settle().await;
        assert_eq!(s.state().boundaries().data.as_ref().map(|c| c.len()), Some(3));
        assert_eq!(s.panel().boundary_status, "3 areas loaded");
    }

    #[tokio::test]
    async fn test_drill_then_final_at_ceiling() {
        let boundaries = Arc::new(StubBoundaries::with(&[("TH", 5)]));
        let filter = Arc::new(StubFilter::inside(&["a"]));
        let mut s = session(&boundaries, &filter, 1);
        s.settle().await;

        s.click_area("TH", "Thailand");
        s.settle().await;
        assert_eq!(s.state().current_level(), AdminLevel::new(1).unwrap());
        assert_eq!(s.state().parent_hierarchy(), &["TH".to_string()]);
        assert_eq!(boundaries.probes_for("TH"), 1);
        assert_eq!(filter.call_count(), 0);

        s.click_area("TH-10", "Bangkok");
        assert_eq!(s.panel().entities.map(|c| c.to_string()).as_deref(), Some("Filtering..."));
        s.settle().await;
        assert!(s.state().is_final());
        assert_eq!(boundaries.probes_for("TH-10"), 0);
        assert_eq!(filter.call_count(), 1);
        assert_eq!(*filter.areas.lock().unwrap(), vec!["TH-10".to_string()]);
        let ids: Vec<&str> = s.state().filter_result().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_probe_failure_filters_instead() {
        let boundaries = Arc::new(StubBoundaries {
            failing: vec!["TH".into()],
            ..Default::default()
        });
        let filter = Arc::new(StubFilter::inside(&["a", "b"]));
        let mut s = session(&boundaries, &filter, 4);
        s.settle().await;

        s.click_area("TH", "Thailand");
        s.settle().await;
        assert!(s.state().is_final());
        assert_eq!(s.state().current_level(), AdminLevel::TOP);
        assert_eq!(s.state().filter_result().len(), 2);
        assert_eq!(filter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zoom_out_reloads_and_resets() {
        let boundaries = Arc::new(StubBoundaries::with(&[("TH", 5)]));
        let filter = Arc::new(StubFilter::inside(&[]));
        let mut s = session(&boundaries, &filter, 4);
        s.settle().await;
        s.click_area("TH", "Thailand");
        s.settle().await;

        s.zoom_out();
        s.settle().await;
        assert_eq!(s.state().current_level(), AdminLevel::TOP);
        assert!(s.state().parent_hierarchy().is_empty());
        let top_loads = boundaries
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.parent.is_none())
            .count();
        assert_eq!(top_loads, 2);
        assert!(!s.panel().can_zoom_out);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_rendered_layers() {
        let boundaries = Arc::new(StubBoundaries::with(&[("TH", 5)]));
        let filter = Arc::new(StubFilter::inside(&[]));
        let mut s = session(&boundaries, &filter, 4);
        let mut layer = BoundaryLayer::new(MemorySurface::default());

        s.settle().await;
        s.click_area("TH", "Thailand");
        s.settle().await;
        assert!(layer.reconcile(LayerSet::for_state(DEFAULT_LAYER_ID, s.state())));
        let provinces = layer.mounted().unwrap().data.clone();
        assert_eq!(provinces.len(), 5);

        boundaries.offline.store(true, Ordering::SeqCst);
        s.zoom_out();
        s.settle().await;
        assert_eq!(s.state().current_level(), AdminLevel::TOP);
        assert!(s.state().boundaries().data.is_none());
        assert_eq!(s.panel().boundary_status, "No data");

        assert!(!layer.reconcile(LayerSet::for_state(DEFAULT_LAYER_ID, s.state())));
        assert!(Arc::ptr_eq(&layer.mounted().unwrap().data, &provinces));
        assert_eq!(
            layer.surface().layer_ids(),
            vec!["admin-boundaries-fill", "admin-boundaries-outline"]
        );
    }
}
