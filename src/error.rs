//! Error taxonomy for the boundary, probe and spatial-filter paths.
//!
//! None of these are fatal to a drill-down session: each is recovered where it
//! happens (no data, final-selection fallback, empty filter result) and logged.

use std::time::Duration;

use thiserror::Error;

/// Failure talking to one of the remote services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<GeoJsonError> for ServiceError {
    fn from(err: GeoJsonError) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

/// Domain-level failures, one per recovery path
#[derive(Debug, Error)]
pub enum AreaError {
    #[error("failed to fetch boundaries for level {level} (parent {parent:?})")]
    BoundaryFetch {
        level: u8,
        parent: Option<String>,
        #[source]
        source: ServiceError,
    },

    #[error("probe for children of {area} failed")]
    Probe {
        area: String,
        #[source]
        source: ServiceError,
    },

    #[error("spatial filter for {area} failed")]
    SpatialFilter {
        area: String,
        #[source]
        source: ServiceError,
    },
}

impl AreaError {
    /// One-line description including the underlying service error
    pub fn report(&self) -> String {
        match std::error::Error::source(self) {
            Some(source) => format!("{self}: {source}"),
            None => self.to_string(),
        }
    }
}

/// GeoJSON payload could not be interpreted as a boundary collection
#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a FeatureCollection")]
    NotACollection,

    #[error("feature {index}: {reason}")]
    Feature { index: usize, reason: String },
}
