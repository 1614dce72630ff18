//! HTTP client for the admin-area boundary endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{BoundaryRequest, BoundaryService};
use crate::error::ServiceError;
use crate::models::BoundaryFeatureCollection;

/// Talks to `GET /api/admin-areas` and `GET /api/admin-areas/children/{parent}`
#[derive(Clone)]
pub struct HttpBoundaryService {
    client: Client,
    base_url: Url,
}

impl HttpBoundaryService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::InvalidRequest(format!("bad boundary url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidRequest(format!(
                "boundary url {base_url} cannot be a base"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub(crate) fn url_for(&self, request: &BoundaryRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "admin-areas"]);
            if let Some(parent) = &request.parent {
                segments.push("children").push(parent);
            }
        }

        let level_key = if request.parent.is_some() {
            "childLevel"
        } else {
            "adminLevel"
        };
        url.query_pairs_mut()
            .append_pair(level_key, &request.level.to_string())
            .append_pair("tolerance", &request.tolerance.to_string());
        url
    }
}

#[async_trait]
impl BoundaryService for HttpBoundaryService {
    async fn fetch_boundaries(
        &self,
        request: &BoundaryRequest,
    ) -> Result<BoundaryFeatureCollection, ServiceError> {
        let url = self.url_for(request);
        debug!("Fetching boundaries from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(BoundaryFeatureCollection::from_geojson(&body)?)
    }
}
