//! Drill-down navigation state and its transition function.
//!
//! [`DrillState`] is an immutable value: [`DrillState::apply`] consumes one
//! [`DrillEvent`] and returns the next state together with the asynchronous
//! work ([`Effect`]s) the transition asks for. Completions of that work come
//! back as events carrying the generation they were dispatched under; a
//! completion whose generation is no longer current is discarded.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::boundary::{BoundaryLoader, BoundaryRequest, LoadTicket, SlotState};
use crate::error::{AreaError, ServiceError};
use crate::models::{AdminLevel, BoundaryFeatureCollection};

/// Progress of the spatial filter for the current final selection
#[derive(Debug, Clone, PartialEq)]
pub enum FilterState<E> {
    Idle,
    Filtering,
    Done(Arc<[E]>),
}

impl<E> FilterState<E> {
    pub fn result(&self) -> &[E] {
        match self {
            FilterState::Done(entities) => entities,
            _ => &[],
        }
    }

    pub fn is_filtering(&self) -> bool {
        matches!(self, FilterState::Filtering)
    }
}

/// Click whose look-ahead probe is still in flight
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProbe {
    pub generation: u64,
    pub code: String,
    pub name: String,
}

/// Why a click ended in a final selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalReason {
    MaxLevel,
    SingleChild,
    ProbeFailed,
}

impl FinalReason {
    fn as_str(self) -> &'static str {
        match self {
            FinalReason::MaxLevel => "max_level",
            FinalReason::SingleChild => "single_child",
            FinalReason::ProbeFailed => "probe_failed",
        }
    }
}

#[derive(Debug)]
pub enum DrillEvent<E> {
    AreaClicked {
        code: String,
        name: String,
    },
    ProbeCompleted {
        generation: u64,
        request: BoundaryRequest,
        outcome: Result<Arc<BoundaryFeatureCollection>, ServiceError>,
    },
    FilterCompleted {
        generation: u64,
        entities: Vec<E>,
    },
    BoundariesLoaded {
        ticket: LoadTicket,
        result: Result<Arc<BoundaryFeatureCollection>, ServiceError>,
    },
    ZoomOut,
    SetMaxLevel(i64),
    HoverChanged(String),
    HoverCleared,
}

/// Asynchronous work requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadBoundaries(LoadTicket),
    /// Look one level deeper under the clicked area
    Probe {
        generation: u64,
        request: BoundaryRequest,
    },
    /// Filter all entities by the finally selected area
    Filter { generation: u64, area: String },
}

/// Result of one transition
#[derive(Debug)]
pub struct Step<E> {
    pub state: DrillState<E>,
    pub effects: Vec<Effect>,
}

impl<E> Step<E> {
    fn unchanged(state: DrillState<E>) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrillState<E> {
    current_level: AdminLevel,
    parent_hierarchy: Vec<String>,
    selected_area: Option<String>,
    selected_area_name: Option<String>,
    is_final: bool,
    max_level: AdminLevel,
    filter: FilterState<E>,
    pending_probe: Option<PendingProbe>,
    hovered_area_name: Option<String>,
    generation: u64,
    boundaries: BoundaryLoader,
}

impl<E: Clone> DrillState<E> {
    /// Fresh state at the top level, with the top-level boundary load queued
    pub fn start(max_level: AdminLevel) -> Step<E> {
        let mut state = Self {
            current_level: AdminLevel::TOP,
            parent_hierarchy: Vec::new(),
            selected_area: None,
            selected_area_name: None,
            is_final: false,
            max_level,
            filter: FilterState::Idle,
            pending_probe: None,
            hovered_area_name: None,
            generation: 0,
            boundaries: BoundaryLoader::default(),
        };
        let ticket = state.boundaries.begin(BoundaryRequest::top_level());
        Step {
            state,
            effects: vec![Effect::LoadBoundaries(ticket)],
        }
    }

    pub fn apply(&self, event: DrillEvent<E>) -> Step<E> {
        let mut next = self.clone();
        match event {
            DrillEvent::AreaClicked { code, name } => next.area_clicked(code, name),
            DrillEvent::ProbeCompleted {
                generation,
                request,
                outcome,
            } => next.probe_completed(generation, request, outcome),
            DrillEvent::FilterCompleted {
                generation,
                entities,
            } => {
                if generation == next.generation && next.filter.is_filtering() {
                    next.filter = FilterState::Done(entities.into());
                } else {
                    debug!("Discarding stale filter result (generation {})", generation);
                }
                Step::unchanged(next)
            }
            DrillEvent::BoundariesLoaded { ticket, result } => {
                next.boundaries.complete(&ticket, result);
                Step::unchanged(next)
            }
            DrillEvent::ZoomOut => next.zoom_out(),
            DrillEvent::SetMaxLevel(level) => {
                next.max_level = AdminLevel::clamped(level);
                Step::unchanged(next)
            }
            DrillEvent::HoverChanged(name) => {
                next.hovered_area_name = Some(name);
                Step::unchanged(next)
            }
            DrillEvent::HoverCleared => {
                next.hovered_area_name = None;
                Step::unchanged(next)
            }
        }
    }

    fn area_clicked(mut self, code: String, name: String) -> Step<E> {
        self.generation += 1;
        let generation = self.generation;
        self.pending_probe = None;

        if self.current_level >= self.max_level {
            let effect = self.select_final(code, name, FinalReason::MaxLevel);
            return Step {
                state: self,
                effects: vec![effect],
            };
        }

        let probe = self
            .current_level
            .deeper()
            .ok_or_else(|| ServiceError::InvalidRequest("no deeper level".to_string()))
            .and_then(|level| BoundaryRequest::children(level, code.clone()));

        match probe {
            Ok(request) => {
                debug!("Probing level {} under {}", request.level, code);
                self.pending_probe = Some(PendingProbe {
                    generation,
                    code,
                    name,
                });
                Step {
                    state: self,
                    effects: vec![Effect::Probe {
                        generation,
                        request,
                    }],
                }
            }
            Err(err) => {
                warn!("Cannot probe under {}: {}", code, err);
                let effect = self.select_final(code, name, FinalReason::ProbeFailed);
                Step {
                    state: self,
                    effects: vec![effect],
                }
            }
        }
    }

    fn probe_completed(
        mut self,
        generation: u64,
        request: BoundaryRequest,
        outcome: Result<Arc<BoundaryFeatureCollection>, ServiceError>,
    ) -> Step<E> {
        let pending = match self.pending_probe.take() {
            Some(p) if p.generation == generation && generation == self.generation => p,
            other => {
                self.pending_probe = other;
                debug!("Discarding stale probe result (generation {})", generation);
                return Step::unchanged(self);
            }
        };

        let children = match outcome {
            Ok(children) if children.len() >= 2 => children,
            Ok(_) => {
                let effect = self.select_final(pending.code, pending.name, FinalReason::SingleChild);
                return Step {
                    state: self,
                    effects: vec![effect],
                };
            }
            Err(source) => {
                let err = AreaError::Probe {
                    area: pending.code.clone(),
                    source,
                };
                warn!(reason = FinalReason::ProbeFailed.as_str(), "{}", err.report());
                let effect = self.select_final(pending.code, pending.name, FinalReason::ProbeFailed);
                return Step {
                    state: self,
                    effects: vec![effect],
                };
            }
        };

        info!(
            "Drilling into {} ({}) -> level {} with {} areas",
            pending.name,
            pending.code,
            request.level,
            children.len()
        );
        self.is_final = false;
        self.filter = FilterState::Idle;
        self.selected_area = Some(pending.code.clone());
        self.selected_area_name = Some(pending.name);
        self.parent_hierarchy.push(pending.code);
        self.current_level = request.level;
        self.hovered_area_name = None;
        self.boundaries.install(request, children);
        Step::unchanged(self)
    }

    fn select_final(&mut self, code: String, name: String, reason: FinalReason) -> Effect {
        info!(
            reason = reason.as_str(),
            "Final selection {} ({}) at level {}", name, code, self.current_level
        );
        self.is_final = true;
        self.selected_area = Some(code.clone());
        self.selected_area_name = Some(name);
        self.filter = FilterState::Filtering;
        Effect::Filter {
            generation: self.generation,
            area: code,
        }
    }

    fn zoom_out(mut self) -> Step<E> {
        if self.current_level.is_top() {
            return Step::unchanged(self);
        }

        self.generation += 1;
        self.current_level = self.current_level.shallower();
        self.parent_hierarchy
            .truncate(self.current_level.get() as usize);
        self.selected_area = None;
        self.selected_area_name = None;
        self.is_final = false;
        self.filter = FilterState::Idle;
        self.pending_probe = None;
        self.hovered_area_name = None;

        let request = match self.parent_hierarchy.last() {
            Some(parent) => BoundaryRequest::children(self.current_level, parent.clone()),
            None => Ok(BoundaryRequest::top_level()),
        };
        debug!("Zoomed out to level {}", self.current_level);

        match request {
            Ok(request) => {
                let ticket = self.boundaries.begin(request);
                Step {
                    state: self,
                    effects: vec![Effect::LoadBoundaries(ticket)],
                }
            }
            Err(err) => {
                warn!("Cannot reload boundaries after zoom-out: {}", err);
                Step::unchanged(self)
            }
        }
    }
}

impl<E> DrillState<E> {
    pub fn current_level(&self) -> AdminLevel {
        self.current_level
    }

    pub fn parent_hierarchy(&self) -> &[String] {
        &self.parent_hierarchy
    }

    /// Parent of the areas shown at the current level
    pub fn parent_area(&self) -> Option<&str> {
        self.parent_hierarchy.last().map(String::as_str)
    }

    pub fn selected_area(&self) -> Option<&str> {
        self.selected_area.as_deref()
    }

    pub fn selected_area_name(&self) -> Option<&str> {
        self.selected_area_name.as_deref()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn max_level(&self) -> AdminLevel {
        self.max_level
    }

    pub fn filter(&self) -> &FilterState<E> {
        &self.filter
    }

    pub fn filter_result(&self) -> &[E] {
        self.filter.result()
    }

    pub fn pending_probe(&self) -> Option<&PendingProbe> {
        self.pending_probe.as_ref()
    }

    pub fn hovered_area_name(&self) -> Option<&str> {
        self.hovered_area_name.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loading state of the collection displayed at the current level
    pub fn boundaries(&self) -> &SlotState {
        self.boundaries.current(self.current_level)
    }
}
