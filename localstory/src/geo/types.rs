//! Geographic data model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Minimum valid latitude.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude.
pub const MAX_LON: f64 = 180.0;

/// WGS84 spatial reference id.
pub const WGS84_WKID: u32 = 4326;

/// Malformed location input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid latitude: {0}. Must be between -90 and 90")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0}. Must be between -180 and 180")]
    InvalidLongitude(f64),

    #[error("Invalid coordinate pair: '{0}'")]
    InvalidCoordinate(String),

    #[error("Invalid ZIP code: '{0}'")]
    InvalidAreaCode(String),

    #[error("Identifier field and value must not be empty")]
    EmptyIdentifier,
}

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Creates a coordinate, rejecting values outside the valid ranges.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(ValidationError::InvalidLatitude(lat));
        }
        if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(ValidationError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Parses `"lat,lon"`.
impl FromStr for Coordinate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidCoordinate(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        Coordinate::new(lat, lon)
    }
}

/// A five-digit US ZIP code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AreaCode(String);

impl AreaCode {
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(ValidationError::InvalidAreaCode(code.to_string()))
        }
    }

    /// Wraps a compile-time constant known to be a valid code.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(AreaCode::new(code).is_ok());
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AreaCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AreaCode::new(s)
    }
}

/// The canonical location of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinate(Coordinate),
    AreaCode(AreaCode),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::Coordinate(c) => write!(f, "{}", c),
            LocationQuery::AreaCode(code) => write!(f, "{}", code),
        }
    }
}

/// Parses an area code or a `"lat,lon"` pair.
impl FromStr for LocationQuery {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(',') {
            s.parse().map(LocationQuery::Coordinate)
        } else {
            s.parse().map(LocationQuery::AreaCode)
        }
    }
}

/// Spatial reference of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(
        rename = "spatialReference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

impl Envelope {
    /// Expands each bound by `buffer` degrees, in WGS84.
    ///
    /// This is the only extent-buffering routine; every map extent written into
    /// a document goes through it.
    pub fn buffered(&self, buffer: f64) -> Envelope {
        Envelope {
            xmin: self.xmin - buffer,
            ymin: self.ymin - buffer,
            xmax: self.xmax + buffer,
            ymax: self.ymax + buffer,
            spatial_reference: Some(SpatialReference { wkid: WGS84_WKID }),
        }
    }
}

/// A geographic record returned by a feature service.
///
/// Features are never modified after they are fetched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<Envelope>,
}

impl Feature {
    /// Raw attribute value.
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field).filter(|v| !v.is_null())
    }

    /// Attribute as text; numbers are rendered without quotes.
    pub fn attribute_str(&self, field: &str) -> Option<String> {
        match self.attribute(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Attribute as a number; numeric strings are parsed.
    pub fn attribute_f64(&self, field: &str) -> Option<f64> {
        match self.attribute(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
