//! Geographic types and the feature service client.
//!
//! Provides the location model ([`Coordinate`], [`AreaCode`],
//! [`LocationQuery`]), the [`Feature`] records returned by census feature
//! services, and [`FeatureClient`] for querying them by point or identifier.

mod client;
mod types;

pub use client::{FeatureClient, GeoError};
pub use types::{
    AreaCode, Coordinate, Envelope, Feature, LocationQuery, SpatialReference, ValidationError,
    MAX_LAT, MAX_LON, MIN_LAT, MIN_LON, WGS84_WKID,
};
