//! Administrative-boundary drill-down.

mod panel;
mod session;
mod state;

pub use panel::{EntityCount, Panel};
pub use session::DrillSession;
pub use state::{DrillEvent, DrillState, Effect, FilterState, FinalReason, PendingProbe, Step};
