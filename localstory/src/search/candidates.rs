//! Address candidate lookup against a geocode service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::SearchSettings;
use crate::fetch::{BoxFuture, Fetch, FetchRequest};
use crate::geo::{Coordinate, ValidationError};

/// Candidate search failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Address search request failed: {0}")]
    Transport(String),

    #[error("Failed to parse address search response: {0}")]
    Parse(String),
}

/// Position of a candidate, in service axis order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateLocation {
    /// Longitude
    pub x: f64,
    /// Latitude
    pub y: f64,
}

/// A geocoded address suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub address: String,
    pub location: CandidateLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Candidate {
    pub fn coordinate(&self) -> Result<Coordinate, ValidationError> {
        Coordinate::new(self.location.y, self.location.x)
    }
}

/// Source of address candidates for free text.
pub trait CandidateSource: Send + Sync {
    fn search(&self, text: String) -> BoxFuture<'_, Result<Vec<Candidate>, SearchError>>;
}

#[derive(Deserialize)]
struct CandidatesResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Candidate source backed by a `findAddressCandidates` endpoint.
pub struct GeocodeClient {
    fetch: Arc<dyn Fetch>,
    service_url: String,
    token: Option<String>,
    max_locations: u32,
    country_code: String,
}

impl GeocodeClient {
    pub fn new(fetch: Arc<dyn Fetch>, service_url: impl Into<String>) -> Self {
        Self {
            fetch,
            service_url: service_url.into(),
            token: None,
            max_locations: crate::config::DEFAULT_SEARCH_MAX_LOCATIONS,
            country_code: crate::config::DEFAULT_SEARCH_COUNTRY_CODE.to_string(),
        }
    }

    pub fn from_settings(fetch: Arc<dyn Fetch>, settings: &SearchSettings) -> Self {
        Self {
            fetch,
            service_url: settings.geocode_url.clone(),
            token: settings.token.clone(),
            max_locations: settings.max_locations,
            country_code: settings.country_code.clone(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request_url(&self, text: &str) -> Result<String, SearchError> {
        let base = format!(
            "{}/findAddressCandidates",
            self.service_url.trim_end_matches('/')
        );
        let max_locations = self.max_locations.to_string();
        let mut params = vec![
            ("f", "json"),
            ("singleLine", text),
            ("countryCode", self.country_code.as_str()),
            ("maxLocations", max_locations.as_str()),
        ];
        if let Some(token) = &self.token {
            params.push(("token", token.as_str()));
        }

        reqwest::Url::parse_with_params(&base, &params)
            .map(String::from)
            .map_err(|e| SearchError::Transport(format!("Invalid geocode URL: {}", e)))
    }
}

impl CandidateSource for GeocodeClient {
    fn search(&self, text: String) -> BoxFuture<'_, Result<Vec<Candidate>, SearchError>> {
        Box::pin(async move {
            let url = self.request_url(&text)?;
            let response = self
                .fetch
                .fetch(FetchRequest::get(url))
                .await
                .map_err(|e| SearchError::Transport(e.to_string()))?;

            if !response.is_ok() {
                return Err(SearchError::Transport(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            let parsed: CandidatesResponse = response
                .json()
                .map_err(|e| SearchError::Parse(e.to_string()))?;
            debug!(query = %text, count = parsed.candidates.len(), "Address candidates received");
            Ok(parsed.candidates)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::MockFetch;
    use crate::fetch::FetchResponse;
    use serde_json::json;

    const SERVICE: &str = "https://geocode.example.com/arcgis/rest/services/World/GeocodeServer";

    #[tokio::test]
    async fn test_search_request_and_parse() {
        let mock = MockFetch::new().json(
            "findAddressCandidates",
            json!({
                "spatialReference": {"wkid": 4326},
                "candidates": [
                    {"address": "380 New York St, Redlands, California, 92373", "location": {"x": -117.19, "y": 34.05}, "score": 100},
                    {"address": "New York, NY", "location": {"x": -74.0, "y": 40.7}}
                ]
            }),
        );
        let client = GeocodeClient::new(Arc::new(mock.clone()), SERVICE).with_token("tok");

        let candidates = client.search("380 New York".to_string()).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].score, Some(100.0));
        assert_eq!(candidates[1].score, None);

        let coordinate = candidates[0].coordinate().unwrap();
        assert_eq!(coordinate.lat(), 34.05);
        assert_eq!(coordinate.lon(), -117.19);

        let url = reqwest::Url::parse(&mock.urls()[0]).unwrap();
        assert!(url.path().ends_with("/GeocodeServer/findAddressCandidates"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for (k, v) in [
            ("f", "json"),
            ("singleLine", "380 New York"),
            ("countryCode", "USA"),
            ("maxLocations", "8"),
            ("token", "tok"),
        ] {
            assert!(pairs.contains(&(k.to_string(), v.to_string())), "missing {}", k);
        }
    }

    #[tokio::test]
    async fn test_no_token_param_without_token() {
        let mock = MockFetch::new().json("findAddressCandidates", json!({"candidates": []}));
        let client = GeocodeClient::new(Arc::new(mock.clone()), SERVICE);

        assert!(client.search("abc".to_string()).await.unwrap().is_empty());
        assert!(!mock.urls()[0].contains("token="));
    }

    #[tokio::test]
    async fn test_search_errors() {
        let mock = MockFetch::new().respond(
            "findAddressCandidates",
            FetchResponse::new(498, vec![], "invalid token"),
        );
        let result = GeocodeClient::new(Arc::new(mock), SERVICE)
            .search("abc".to_string())
            .await;
        assert!(matches!(result, Err(SearchError::Transport(_))));

        let mock = MockFetch::new().respond(
            "findAddressCandidates",
            FetchResponse::new(200, vec![], "not json"),
        );
        let result = GeocodeClient::new(Arc::new(mock), SERVICE)
            .search("abc".to_string())
            .await;
        assert!(matches!(result, Err(SearchError::Parse(_))));
    }
}
