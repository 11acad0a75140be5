//! Feature aggregation for the three comparison scopes.
//!
//! Given a resolved [`LocationQuery`], the [`FeatureAggregator`] fetches the
//! local feature first, then the regional and national features concurrently.
//! The regional lookup is keyed by the local feature's parent-region code, so
//! nothing else is requested until the local feature is known.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{
    ServiceSettings, DEFAULT_LOCAL_ID_FIELD, DEFAULT_LOCAL_SERVICE_URL, DEFAULT_NATIONAL_CODE,
    DEFAULT_NATIONAL_SERVICE_URL, DEFAULT_PARENT_FIELD, DEFAULT_REGIONAL_SERVICE_URL,
};
use crate::geo::{Feature, FeatureClient, GeoError, LocationQuery};

/// Comparison scope of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Regional,
    National,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => write!(f, "local"),
            Scope::Regional => write!(f, "regional"),
            Scope::National => write!(f, "national"),
        }
    }
}

/// Aggregation failures.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A required feature does not exist.
    #[error("No {scope} data found for {key}")]
    NotFound { scope: Scope, key: String },

    /// The local feature has no parent-region code to key the regional lookup.
    #[error("Local feature has no '{0}' attribute")]
    MissingParentCode(String),

    /// A lookup failed outright.
    #[error("Failed to fetch {scope} data: {source}")]
    Lookup {
        scope: Scope,
        #[source]
        source: GeoError,
    },
}

/// Feature service endpoints and key fields for each scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeServices {
    pub local_url: String,
    pub regional_url: String,
    pub national_url: String,
    /// Identifier field of local features (the area code).
    pub local_id_field: String,
    /// Local attribute naming the parent region; also the regional and national key field.
    pub parent_field: String,
    /// Key value of the single national feature.
    pub national_code: String,
}

impl Default for ScopeServices {
    fn default() -> Self {
        Self {
            local_url: DEFAULT_LOCAL_SERVICE_URL.to_string(),
            regional_url: DEFAULT_REGIONAL_SERVICE_URL.to_string(),
            national_url: DEFAULT_NATIONAL_SERVICE_URL.to_string(),
            local_id_field: DEFAULT_LOCAL_ID_FIELD.to_string(),
            parent_field: DEFAULT_PARENT_FIELD.to_string(),
            national_code: DEFAULT_NATIONAL_CODE.to_string(),
        }
    }
}

impl ScopeServices {
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            local_url: settings.local_url.clone(),
            regional_url: settings.regional_url.clone(),
            national_url: settings.national_url.clone(),
            local_id_field: settings.local_id_field.clone(),
            parent_field: settings.parent_field.clone(),
            national_code: settings.national_code.clone(),
        }
    }
}

/// The local, regional and national features of a session.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub local: Arc<Feature>,
    pub regional: Arc<Feature>,
    pub national: Arc<Feature>,
}

impl FeatureSet {
    pub fn get(&self, scope: Scope) -> &Feature {
        match scope {
            Scope::Local => &self.local,
            Scope::Regional => &self.regional,
            Scope::National => &self.national,
        }
    }
}

/// Fetches the three scoped features for a location.
#[derive(Clone)]
pub struct FeatureAggregator {
    client: FeatureClient,
    services: ScopeServices,
}

impl FeatureAggregator {
    pub fn new(client: FeatureClient, services: ScopeServices) -> Self {
        Self { client, services }
    }

    pub fn services(&self) -> &ScopeServices {
        &self.services
    }

    pub fn client(&self) -> &FeatureClient {
        &self.client
    }

    /// Fetches all three features, or fails if any is missing.
    pub async fn aggregate(&self, query: &LocationQuery) -> Result<FeatureSet, AggregationError> {
        let services = &self.services;

        let local = match query {
            LocationQuery::AreaCode(code) => {
                self.client
                    .fetch_by_id(
                        &services.local_url,
                        &services.local_id_field,
                        code.as_str(),
                        true,
                    )
                    .await
            }
            LocationQuery::Coordinate(coordinate) => {
                self.client
                    .fetch_by_point(*coordinate, &services.local_url, true)
                    .await
            }
        }
        .map_err(|source| AggregationError::Lookup {
            scope: Scope::Local,
            source,
        })?
        .ok_or_else(|| AggregationError::NotFound {
            scope: Scope::Local,
            key: query.to_string(),
        })?;

        let parent_code = local
            .attribute_str(&services.parent_field)
            .ok_or_else(|| AggregationError::MissingParentCode(services.parent_field.clone()))?;
        debug!(query = %query, parent = %parent_code, "Local feature resolved");

        let (regional, national) = tokio::join!(
            self.client.fetch_by_id(
                &services.regional_url,
                &services.parent_field,
                &parent_code,
                false
            ),
            self.client.fetch_by_id(
                &services.national_url,
                &services.parent_field,
                &services.national_code,
                false
            ),
        );

        let regional = require(regional, Scope::Regional, &parent_code)?;
        let national = require(national, Scope::National, &services.national_code)?;

        info!(query = %query, region = %parent_code, "Feature aggregation complete");

        Ok(FeatureSet {
            local: Arc::new(local),
            regional: Arc::new(regional),
            national: Arc::new(national),
        })
    }
}

fn require(
    result: Result<Option<Feature>, GeoError>,
    scope: Scope,
    key: &str,
) -> Result<Feature, AggregationError> {
    result
        .map_err(|source| AggregationError::Lookup { scope, source })?
        .ok_or_else(|| AggregationError::NotFound {
            scope,
            key: key.to_string(),
        })
}
