//! Location resolution strategies.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::geolocation::{GeolocationError, Geolocator, PositionOptions};
use super::session::SessionUrl;
use crate::config::{default_fallback_code, FallbackMode, LocationSettings};
use crate::geo::{AreaCode, Coordinate, FeatureClient, LocationQuery};

/// How the last-resort location is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackPolicy {
    /// Uniformly random from the list.
    Random(Vec<AreaCode>),
    /// Always the same code.
    Fixed(AreaCode),
}

impl FallbackPolicy {
    pub fn from_settings(settings: &LocationSettings) -> Self {
        match settings.fallback {
            FallbackMode::Random => FallbackPolicy::Random(settings.fallback_codes.clone()),
            FallbackMode::Fixed => FallbackPolicy::Fixed(settings.fixed_code.clone()),
        }
    }

    /// Picks a code. An empty random list yields the built-in default.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> AreaCode {
        match self {
            FallbackPolicy::Fixed(code) => code.clone(),
            FallbackPolicy::Random(codes) if codes.is_empty() => default_fallback_code(),
            FallbackPolicy::Random(codes) => codes[rng.gen_range(0..codes.len())].clone(),
        }
    }
}

/// Which strategy produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Parameter,
    Geolocation,
    Fallback,
}

/// A resolved location and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub query: LocationQuery,
    pub source: ResolutionSource,
}

/// Reverse-geocoding target for position fixes.
#[derive(Clone)]
pub struct ReverseLookup {
    pub client: FeatureClient,
    /// Local feature service URL.
    pub service_url: String,
    /// Attribute holding the area code.
    pub id_field: String,
}

/// Determines a session's location.
///
/// Strategies run in order: the URL parameter, a one-shot device position fix,
/// then the fallback policy. Resolution never fails.
pub struct LocationResolver {
    geolocator: Arc<dyn Geolocator>,
    options: PositionOptions,
    reverse: Option<ReverseLookup>,
    fallback: FallbackPolicy,
    rng: Mutex<StdRng>,
}

impl LocationResolver {
    /// Creates a resolver. With `reverse` set, position fixes are resolved to
    /// area codes; otherwise the coordinate itself becomes the query.
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        reverse: Option<ReverseLookup>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            geolocator,
            options: PositionOptions::default(),
            reverse,
            fallback,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the random source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// Picks a fallback code.
    pub fn pick_fallback(&self) -> AreaCode {
        self.fallback.pick(&mut *self.rng.lock())
    }

    pub async fn resolve(&self, url: &SessionUrl) -> Resolution {
        if let Some(query) = url.query() {
            debug!(query = %query, "Using location parameter");
            return Resolution {
                query,
                source: ResolutionSource::Parameter,
            };
        }

        info!("No location parameter, attempting geolocation");
        if let Some(query) = self.geolocate().await {
            return Resolution {
                query,
                source: ResolutionSource::Geolocation,
            };
        }

        let code = self.pick_fallback();
        info!(code = %code, "Using fallback location");
        Resolution {
            query: LocationQuery::AreaCode(code),
            source: ResolutionSource::Fallback,
        }
    }

    /// One position request, bounded by the configured timeout.
    async fn position(&self) -> Result<Coordinate, GeolocationError> {
        tokio::time::timeout(self.options.timeout, self.geolocator.locate(self.options))
            .await
            .unwrap_or(Err(GeolocationError::Timeout(self.options.timeout)))
    }

    async fn geolocate(&self) -> Option<LocationQuery> {
        let coordinate = match self.position().await {
            Ok(coordinate) => coordinate,
            Err(e) => {
                warn!(error = %e, "Geolocation failed");
                return None;
            }
        };
        debug!(position = %coordinate, "Geolocated");

        let Some(reverse) = &self.reverse else {
            return Some(LocationQuery::Coordinate(coordinate));
        };

        match reverse
            .client
            .fetch_by_point(coordinate, &reverse.service_url, false)
            .await
        {
            Ok(Some(feature)) => {
                let code = feature
                    .attribute_str(&reverse.id_field)
                    .and_then(|id| AreaCode::new(&id).ok());
                match code {
                    Some(code) => {
                        info!(code = %code, "Resolved position to area code");
                        Some(LocationQuery::AreaCode(code))
                    }
                    None => {
                        warn!(field = %reverse.id_field, "Feature at position has no usable area code");
                        None
                    }
                }
            }
            Ok(None) => {
                warn!(position = %coordinate, "No area found for position");
                None
            }
            Err(e) => {
                warn!(error = %e, "Reverse lookup failed");
                None
            }
        }
    }
}
