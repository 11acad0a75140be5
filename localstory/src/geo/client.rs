//! Attribute queries against geospatial feature services.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::types::{Coordinate, Envelope, Feature, ValidationError, WGS84_WKID};
use crate::fetch::{Fetch, FetchError, FetchRequest};

/// Errors from a feature service query.
///
/// "No matching feature" is not an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request failed or the service answered with a non-2xx status.
    #[error("Feature service request failed: {0}")]
    Transport(String),

    /// The response body could not be parsed.
    #[error("Failed to parse feature service response: {0}")]
    Parse(String),

    /// The service answered with an error payload.
    #[error("Feature service error {code}: {message}")]
    Service { code: i64, message: String },
}

impl From<FetchError> for GeoError {
    fn from(e: FetchError) -> Self {
        GeoError::Transport(e.to_string())
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<RawFeature>,
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Client for feature service `query` endpoints.
///
/// Only attributes are requested; geometry is suppressed. When an envelope is
/// requested, the feature's bounding box is attached as [`Feature::extent`].
#[derive(Clone)]
pub struct FeatureClient {
    fetch: Arc<dyn Fetch>,
}

impl FeatureClient {
    pub fn new(fetch: Arc<dyn Fetch>) -> Self {
        Self { fetch }
    }

    /// Finds the feature intersecting a point.
    pub async fn fetch_by_point(
        &self,
        coordinate: Coordinate,
        service_url: &str,
        include_envelope: bool,
    ) -> Result<Option<Feature>, GeoError> {
        let geometry = format!("{},{}", coordinate.lon(), coordinate.lat());
        let wkid = WGS84_WKID.to_string();
        let mut params = vec![
            ("where", "1=1"),
            ("geometry", geometry.as_str()),
            ("geometryType", "esriGeometryPoint"),
            ("inSR", wkid.as_str()),
            ("spatialRel", "esriSpatialRelIntersects"),
            ("outFields", "*"),
            ("returnGeometry", "false"),
            ("f", "json"),
        ];
        if include_envelope {
            params.push(("returnEnvelope", "true"));
            params.push(("outSR", wkid.as_str()));
        }

        let url = query_url(service_url, &params)?;
        self.query(url, include_envelope).await
    }

    /// Finds the feature whose `id_field` equals `id_value` exactly.
    pub async fn fetch_by_id(
        &self,
        service_url: &str,
        id_field: &str,
        id_value: &str,
        include_envelope: bool,
    ) -> Result<Option<Feature>, GeoError> {
        if id_field.trim().is_empty() || id_value.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier.into());
        }

        let where_clause = format!("{}='{}'", id_field, id_value.replace('\'', "''"));
        let wkid = WGS84_WKID.to_string();
        let mut params = vec![
            ("where", where_clause.as_str()),
            ("outFields", "*"),
            ("returnGeometry", "false"),
            ("f", "json"),
        ];
        if include_envelope {
            params.push(("returnEnvelope", "true"));
            params.push(("outSR", wkid.as_str()));
        }

        let url = query_url(service_url, &params)?;
        self.query(url, include_envelope).await
    }

    async fn query(&self, url: String, include_envelope: bool) -> Result<Option<Feature>, GeoError> {
        let response = self.fetch.fetch(FetchRequest::get(url.clone())).await?;

        if !response.is_ok() {
            return Err(GeoError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let data: QueryResponse = response
            .json()
            .map_err(|e| GeoError::Parse(e.to_string()))?;

        if let Some(error) = data.error {
            return Err(GeoError::Service {
                code: error.code,
                message: error.message,
            });
        }

        debug!(url = %url, count = data.features.len(), "Feature query completed");

        let Some(raw) = data.features.into_iter().next() else {
            return Ok(None);
        };

        let extent = if include_envelope {
            raw.geometry
                .as_ref()
                .and_then(|g| g.get("envelope"))
                .and_then(|e| serde_json::from_value::<Envelope>(e.clone()).ok())
        } else {
            None
        };

        Ok(Some(Feature {
            attributes: raw.attributes,
            geometry: raw.geometry,
            extent,
        }))
    }
}

fn query_url(service_url: &str, params: &[(&str, &str)]) -> Result<String, GeoError> {
    let base = format!("{}/query", service_url.trim_end_matches('/'));
    reqwest::Url::parse_with_params(&base, params)
        .map(String::from)
        .map_err(|e| GeoError::Transport(format!("Invalid service URL '{}': {}", service_url, e)))
}
