//! Loading state for the top-level and children boundary collections.

use std::sync::Arc;

use tracing::{debug, warn};

use super::BoundaryRequest;
use crate::error::{AreaError, ServiceError};
use crate::models::{AdminLevel, BoundaryFeatureCollection};

/// The top-level collection and the children collection are loaded independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryRole {
    TopLevel,
    Children,
}

impl BoundaryRole {
    pub fn for_level(level: AdminLevel) -> Self {
        if level.is_top() {
            BoundaryRole::TopLevel
        } else {
            BoundaryRole::Children
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotState {
    pub loading: bool,
    pub data: Option<Arc<BoundaryFeatureCollection>>,
    generation: u64,
}

/// Identifies one dispatched load; completions with an outdated ticket are dropped
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    pub request: BoundaryRequest,
    pub generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BoundaryLoader {
    top: SlotState,
    children: SlotState,
}

impl BoundaryLoader {
    pub fn slot(&self, role: BoundaryRole) -> &SlotState {
        match role {
            BoundaryRole::TopLevel => &self.top,
            BoundaryRole::Children => &self.children,
        }
    }

    fn slot_mut(&mut self, role: BoundaryRole) -> &mut SlotState {
        match role {
            BoundaryRole::TopLevel => &mut self.top,
            BoundaryRole::Children => &mut self.children,
        }
    }

    /// The slot whose collection is displayed at `level`
    pub fn current(&self, level: AdminLevel) -> &SlotState {
        self.slot(BoundaryRole::for_level(level))
    }

    /// Mark the request's slot loading and hand out a ticket for the completion
    pub fn begin(&mut self, request: BoundaryRequest) -> LoadTicket {
        let slot = self.slot_mut(request.role());
        slot.generation += 1;
        slot.loading = true;
        LoadTicket {
            request,
            generation: slot.generation,
        }
    }

    /// Apply a completed load. Returns false when the ticket was superseded.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Arc<BoundaryFeatureCollection>, ServiceError>,
    ) -> bool {
        let slot = self.slot_mut(ticket.request.role());
        if slot.generation != ticket.generation {
            debug!(
                "Discarding stale boundary load for level {} (generation {} != {})",
                ticket.request.level, ticket.generation, slot.generation
            );
            return false;
        }

        slot.loading = false;
        match result {
            Ok(collection) => {
                debug!(
                    "Loaded {} boundaries for level {}",
                    collection.len(),
                    ticket.request.level
                );
                slot.data = Some(collection);
            }
            Err(source) => {
                let err = AreaError::BoundaryFetch {
                    level: ticket.request.level.get(),
                    parent: ticket.request.parent.clone(),
                    source,
                };
                warn!("{}", err.report());
                slot.data = None;
            }
        }
        true
    }

    /// Install an already fetched collection, superseding any in-flight load
    pub fn install(&mut self, request: BoundaryRequest, collection: Arc<BoundaryFeatureCollection>) {
        let ticket = self.begin(request);
        self.complete(&ticket, Ok(collection));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(n: usize) -> Arc<BoundaryFeatureCollection> {
        let features = (0..n)
            .map(|i| crate::models::BoundaryFeature {
                id: crate::models::FeatureId::Number(i as u64),
                name: format!("Area {i}"),
                code: format!("A{i}"),
                geometry: geo::MultiPolygon(vec![]),
                properties: Default::default(),
            })
            .collect();
        Arc::new(BoundaryFeatureCollection::new(features))
    }

    #[test]
    fn test_success_replaces_slot() {
        let mut loader = BoundaryLoader::default();
        let ticket = loader.begin(BoundaryRequest::top_level());
        assert!(loader.slot(BoundaryRole::TopLevel).loading);

        assert!(loader.complete(&ticket, Ok(collection(3))));
        let slot = loader.current(AdminLevel::TOP);
        assert!(!slot.loading);
        assert_eq!(slot.data.as_ref().map(|c| c.len()), Some(3));
        assert!(loader.slot(BoundaryRole::Children).data.is_none());
    }

    #[test]
    fn test_failure_clears_data() {
        let mut loader = BoundaryLoader::default();
        loader.install(BoundaryRequest::top_level(), collection(2));

        let ticket = loader.begin(BoundaryRequest::top_level());
        loader.complete(&ticket, Err(ServiceError::Decode("boom".into())));
        let slot = loader.slot(BoundaryRole::TopLevel);
        assert!(!slot.loading);
        assert!(slot.data.is_none());
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let mut loader = BoundaryLoader::default();
        let level1 = AdminLevel::new(1).unwrap();
        let old = loader.begin(BoundaryRequest::children(level1, "TH").unwrap());
        let new = loader.begin(BoundaryRequest::children(level1, "VN").unwrap());

        assert!(!loader.complete(&old, Ok(collection(5))));
        assert!(loader.slot(BoundaryRole::Children).loading);

        assert!(loader.complete(&new, Ok(collection(2))));
        assert_eq!(
            loader.slot(BoundaryRole::Children).data.as_ref().map(|c| c.len()),
            Some(2)
        );
    }
}
