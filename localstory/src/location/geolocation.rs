//! One-shot position fixes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::DEFAULT_GEOLOCATION_TIMEOUT_SECS;
use crate::fetch::{BoxFuture, Fetch, FetchRequest};
use crate::geo::Coordinate;

/// Why no position fix was obtained.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("Geolocation permission denied")]
    Denied,

    #[error("Geolocation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Geolocation unavailable: {0}")]
    Unavailable(String),
}

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Maximum age of a cached fix; zero demands a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(DEFAULT_GEOLOCATION_TIMEOUT_SECS),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Source of the device's current position.
pub trait Geolocator: Send + Sync {
    /// Requests one position fix. Never retried by callers.
    fn locate(&self, options: PositionOptions) -> BoxFuture<'_, Result<Coordinate, GeolocationError>>;
}

#[derive(Deserialize)]
struct IpLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// Approximates the device position from its public IP address.
///
/// Fixes are city-level whatever `high_accuracy` asks for. The last fix is
/// kept and reused while it is younger than the request's `maximum_age`.
pub struct IpGeolocator {
    fetch: Arc<dyn Fetch>,
    url: String,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl IpGeolocator {
    pub fn new(fetch: Arc<dyn Fetch>, url: impl Into<String>) -> Self {
        Self {
            fetch,
            url: url.into(),
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinate> {
        match *self.last_fix.lock() {
            Some((at, coordinate)) if !maximum_age.is_zero() && at.elapsed() <= maximum_age => {
                Some(coordinate)
            }
            _ => None,
        }
    }
}

impl Geolocator for IpGeolocator {
    fn locate(&self, options: PositionOptions) -> BoxFuture<'_, Result<Coordinate, GeolocationError>> {
        Box::pin(async move {
            if let Some(coordinate) = self.cached(options.maximum_age) {
                debug!(position = %coordinate, "Reusing cached IP geolocation fix");
                return Ok(coordinate);
            }
            if options.high_accuracy {
                debug!("High accuracy requested; IP geolocation is city-level");
            }

            let response = self
                .fetch
                .fetch(FetchRequest::get(self.url.clone()))
                .await
                .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;

            match response.status() {
                401 | 403 => return Err(GeolocationError::Denied),
                status if !(200..300).contains(&status) => {
                    return Err(GeolocationError::Unavailable(format!("HTTP {}", status)));
                }
                _ => {}
            }

            let location: IpLocation = response
                .json()
                .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;

            if location.error {
                let reason = location.reason.unwrap_or_else(|| "unknown error".to_string());
                warn!(reason = %reason, "IP geolocation service returned an error");
                return Err(GeolocationError::Unavailable(reason));
            }

            let (Some(lat), Some(lon)) = (location.latitude, location.longitude) else {
                return Err(GeolocationError::Unavailable(
                    "response has no coordinates".to_string(),
                ));
            };

            let coordinate =
                Coordinate::new(lat, lon).map_err(|e| GeolocationError::Unavailable(e.to_string()))?;
            debug!(position = %coordinate, "IP geolocation fix");
            *self.last_fix.lock() = Some((Instant::now(), coordinate));
            Ok(coordinate)
        })
    }
}

/// Geolocator with a predetermined outcome.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    outcome: Result<Coordinate, GeolocationError>,
}

impl FixedGeolocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            outcome: Ok(coordinate),
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            outcome: Err(error),
        }
    }

    /// A geolocator whose permission is always refused.
    pub fn denied() -> Self {
        Self::failing(GeolocationError::Denied)
    }
}

impl Geolocator for FixedGeolocator {
    fn locate(&self, _options: PositionOptions) -> BoxFuture<'_, Result<Coordinate, GeolocationError>> {
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}
