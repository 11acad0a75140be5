//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::geo::AreaCode;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Feature service endpoints
    pub services: ServiceSettings,
    /// Embedded story and its documents
    pub story: StorySettings,
    /// Location resolution
    pub location: LocationSettings,
    /// Address search
    pub search: SearchSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Feature service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// ZIP code layer
    pub local_url: String,
    /// State layer
    pub regional_url: String,
    /// Nation layer
    pub national_url: String,
    /// Identifier field of the local layer
    pub local_id_field: String,
    /// Parent-region field, shared by all three layers
    pub parent_field: String,
    /// Key of the national feature
    pub national_code: String,
    /// HTTP request timeout in seconds
    pub timeout: u64,
}

/// Story configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StorySettings {
    /// Host page URL that redirects target
    pub page_url: String,
    pub story_id: String,
    /// Web map item filtered to the local area
    pub content_map_item: String,
    /// Locator web map item
    pub locator_map_item: String,
    pub story_service_url: String,
    pub item_data_url: String,
    /// Map extent buffer in degrees
    pub extent_buffer: f64,
    /// Redirect delay in debug mode, in seconds
    pub debug_redirect_delay: u64,
}

/// How the fallback location is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    /// Uniformly random from `fallback_codes`
    Random,
    /// Always `fixed_code`
    Fixed,
}

impl fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackMode::Random => write!(f, "random"),
            FallbackMode::Fixed => write!(f, "fixed"),
        }
    }
}

impl FromStr for FallbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(FallbackMode::Random),
            "fixed" => Ok(FallbackMode::Fixed),
            other => Err(format!("unknown fallback mode '{}'", other)),
        }
    }
}

/// Location resolution configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    pub fallback: FallbackMode,
    pub fallback_codes: Vec<AreaCode>,
    pub fixed_code: AreaCode,
    /// IP geolocation endpoint
    pub geolocation_url: String,
    /// Geolocation timeout in seconds
    pub geolocation_timeout: u64,
    /// Reverse-resolve a position fix to its ZIP code
    pub reverse_geocode: bool,
}

/// Address search configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Geocode service root (without `/findAddressCandidates`)
    pub geocode_url: String,
    /// Access token for the geocode service
    pub token: Option<String>,
    /// Debounce delay in milliseconds
    pub debounce_ms: u64,
    /// Minimum trimmed query length before searching
    pub min_chars: usize,
    pub max_locations: u32,
    pub country_code: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
    /// Default filter when RUST_LOG is not set
    pub level: String,
}
