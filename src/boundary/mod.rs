//! Boundary data loading.
//!
//! [`BoundaryService`] is the seam to the remote boundary service,
//! [`HttpBoundaryService`] its HTTP implementation and [`BoundaryLoader`] the
//! per-role loading state a drill-down session keeps.

mod client;
mod loader;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{AdminLevel, BoundaryFeatureCollection};

pub use client::HttpBoundaryService;
pub use loader::{BoundaryLoader, BoundaryRole, LoadTicket, SlotState};

/// Which boundary collection to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRequest {
    pub level: AdminLevel,
    /// Absent exactly when `level` is the top level
    pub parent: Option<String>,
    pub tolerance: f64,
}

impl BoundaryRequest {
    /// Top-level collection at the level-0 tolerance
    pub fn top_level() -> Self {
        Self {
            level: AdminLevel::TOP,
            parent: None,
            tolerance: AdminLevel::TOP.tolerance(),
        }
    }

    /// Children of `parent` at `level`, using that level's tolerance
    pub fn children(level: AdminLevel, parent: impl Into<String>) -> Result<Self, ServiceError> {
        Self::new(level, Some(parent.into()), level.tolerance())
    }

    pub fn new(
        level: AdminLevel,
        parent: Option<String>,
        tolerance: f64,
    ) -> Result<Self, ServiceError> {
        match (&parent, level.is_top()) {
            (Some(p), true) => Err(ServiceError::InvalidRequest(format!(
                "level 0 has no parent (got {p})"
            ))),
            (None, false) => Err(ServiceError::InvalidRequest(format!(
                "level {level} requires a parent area"
            ))),
            _ if !(tolerance.is_finite() && tolerance >= 0.0) => Err(
                ServiceError::InvalidRequest(format!("invalid tolerance {tolerance}")),
            ),
            _ => Ok(Self {
                level,
                parent,
                tolerance,
            }),
        }
    }

    pub fn role(&self) -> BoundaryRole {
        BoundaryRole::for_level(self.level)
    }
}

/// Remote source of boundary geometry
#[async_trait]
pub trait BoundaryService: Send + Sync {
    async fn fetch_boundaries(
        &self,
        request: &BoundaryRequest,
    ) -> Result<BoundaryFeatureCollection, ServiceError>;
}

/// Fetch with an upper bound on how long the call may hang
pub async fn fetch_boundaries(
    service: &dyn BoundaryService,
    request: &BoundaryRequest,
    timeout: Duration,
) -> Result<BoundaryFeatureCollection, ServiceError> {
    tokio::time::timeout(timeout, service.fetch_boundaries(request))
        .await
        .map_err(|_| ServiceError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hanging;

    #[async_trait]
    impl BoundaryService for Hanging {
        async fn fetch_boundaries(
            &self,
            _request: &BoundaryRequest,
        ) -> Result<BoundaryFeatureCollection, ServiceError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_request_parent_rules() {
        let level1 = AdminLevel::new(1).unwrap();
        assert!(BoundaryRequest::new(AdminLevel::TOP, Some("TH".into()), 0.0).is_err());
        assert!(BoundaryRequest::new(level1, None, 0.0).is_err());
        assert!(BoundaryRequest::new(level1, Some("TH".into()), -1.0).is_err());

        let req = BoundaryRequest::children(level1, "TH").unwrap();
        assert_eq!(req.role(), BoundaryRole::Children);
        assert_eq!(req.tolerance, 0.0);
        assert_eq!(BoundaryRequest::top_level().tolerance, 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out() {
        let err = fetch_boundaries(&Hanging, &BoundaryRequest::top_level(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout(_)));
    }
}
