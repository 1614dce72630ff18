//! GraphQL client for the `filterCoordinatesByBoundary` query.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AreaFilterService, CoordinateInput};
use crate::error::ServiceError;

pub const FILTER_QUERY: &str = r#"query FilterCoordinatesByBoundary($coordinates: [CoordinateInput!]!, $boundaryId: String!) {
  filterCoordinatesByBoundary(coordinates: $coordinates, boundaryId: $boundaryId) {
    id
    lat
    lon
  }
}"#;

/// GraphQL-over-HTTP request body
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphQlRequest<V> {
    pub query: String,
    pub variables: V,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterVariables {
    pub coordinates: Vec<CoordinateInput>,
    pub boundary_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterData {
    pub filter_coordinates_by_boundary: Vec<CoordinateInput>,
}

/// Point-in-polygon filtering through the GraphQL API
#[derive(Clone)]
pub struct GraphQlFilterService {
    client: Client,
    endpoint: String,
}

impl GraphQlFilterService {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl AreaFilterService for GraphQlFilterService {
    async fn filter_coordinates(
        &self,
        coordinates: &[CoordinateInput],
        area_id: &str,
    ) -> Result<Vec<CoordinateInput>, ServiceError> {
        let request = GraphQlRequest {
            query: FILTER_QUERY.to_string(),
            variables: FilterVariables {
                coordinates: coordinates.to_vec(),
                boundary_id: area_id.to_string(),
            },
        };

        debug!(
            "Filtering {} coordinates by boundary {} via {}",
            coordinates.len(),
            area_id,
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GraphQlResponse<FilterData> = response.json().await?;
        into_result(body)
    }
}

fn into_result(
    body: GraphQlResponse<FilterData>,
) -> Result<Vec<CoordinateInput>, ServiceError> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(ServiceError::GraphQl(messages.join("; ")));
    }

    body.data
        .map(|d| d.filter_coordinates_by_boundary)
        .ok_or_else(|| ServiceError::Decode("graphql response has no data".to_string()))
}
