//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::settings::*;
use crate::geo::AreaCode;

// =============================================================================
// [services]
// =============================================================================

/// Census demographics feature service, ZIP code layer.
pub const DEFAULT_LOCAL_SERVICE_URL: &str = "https://services8.arcgis.com/peDZJliSvYims39Q/ArcGIS/rest/services/USA_Latest_Esri_Demographics/FeatureServer/1";

/// Census demographics feature service, state layer.
pub const DEFAULT_REGIONAL_SERVICE_URL: &str = "https://services8.arcgis.com/peDZJliSvYims39Q/ArcGIS/rest/services/USA_Latest_Esri_Demographics/FeatureServer/2";

/// Census demographics feature service, nation layer.
pub const DEFAULT_NATIONAL_SERVICE_URL: &str = "https://services8.arcgis.com/peDZJliSvYims39Q/ArcGIS/rest/services/USA_Latest_Esri_Demographics/FeatureServer/0";

pub const DEFAULT_LOCAL_ID_FIELD: &str = "ID";
pub const DEFAULT_PARENT_FIELD: &str = "ST_ABBREV";
pub const DEFAULT_NATIONAL_CODE: &str = "US";

/// HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// [story]
// =============================================================================

/// Page that hosts the embedded story; redirects are built against it.
pub const DEFAULT_PAGE_URL: &str = "http://localhost:5173/";

pub const DEFAULT_STORY_ID: &str = "4961e406d6364e198c71cdf3de491285";
pub const DEFAULT_CONTENT_MAP_ITEM: &str = "0bd47aab81d448a88d0b706c261b3931";
pub const DEFAULT_LOCATOR_MAP_ITEM: &str = "a522e87aaa1747b0af699d3b9fe7b21c";

/// Base URL of the story embed service.
pub const DEFAULT_STORY_SERVICE_URL: &str = "https://storymaps.arcgis.com";

/// Base URL of portal item data (`{base}/{item}/data`).
pub const DEFAULT_ITEM_DATA_URL: &str = "https://www.arcgis.com/sharing/rest/content/items";

/// Map extent buffer in degrees.
pub const DEFAULT_EXTENT_BUFFER: f64 = 0.05;

/// Redirect delay in debug mode, in seconds.
pub const DEFAULT_DEBUG_REDIRECT_DELAY_SECS: u64 = 3;

// =============================================================================
// [location]
// =============================================================================

/// Area codes the random fallback picks from.
pub const DEFAULT_FALLBACK_CODES: [&str; 18] = [
    "33109", "94027", "90210", "11962", "31561", "98039", "96754", "99501", "20817", "30327",
    "97034", "75205", "81435", "78704", "55406", "68104", "58201", "71048",
];

/// Area code used when no other fallback is available.
pub const DEFAULT_FALLBACK_CODE: &str = "90210";

/// IP geolocation endpoint used in place of a device position fix.
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

/// One-shot geolocation timeout in seconds.
pub const DEFAULT_GEOLOCATION_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// [search]
// =============================================================================

pub const DEFAULT_GEOCODE_URL: &str =
    "https://geocode-api.arcgis.com/arcgis/rest/services/World/GeocodeServer";
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SEARCH_MIN_CHARS: usize = 3;
pub const DEFAULT_SEARCH_MAX_LOCATIONS: u32 = 8;
pub const DEFAULT_SEARCH_COUNTRY_CODE: &str = "USA";

// =============================================================================
// [logging]
// =============================================================================

pub const DEFAULT_LOG_FILE: &str = "localstory.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Built-in fallback code as a validated value.
pub fn default_fallback_code() -> AreaCode {
    AreaCode::from_static(DEFAULT_FALLBACK_CODE)
}

/// Built-in random fallback list as validated values.
pub fn default_fallback_codes() -> Vec<AreaCode> {
    DEFAULT_FALLBACK_CODES
        .iter()
        .map(|c| AreaCode::from_static(c))
        .collect()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            services: ServiceSettings {
                local_url: DEFAULT_LOCAL_SERVICE_URL.to_string(),
                regional_url: DEFAULT_REGIONAL_SERVICE_URL.to_string(),
                national_url: DEFAULT_NATIONAL_SERVICE_URL.to_string(),
                local_id_field: DEFAULT_LOCAL_ID_FIELD.to_string(),
                parent_field: DEFAULT_PARENT_FIELD.to_string(),
                national_code: DEFAULT_NATIONAL_CODE.to_string(),
                timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            story: StorySettings {
                page_url: DEFAULT_PAGE_URL.to_string(),
                story_id: DEFAULT_STORY_ID.to_string(),
                content_map_item: DEFAULT_CONTENT_MAP_ITEM.to_string(),
                locator_map_item: DEFAULT_LOCATOR_MAP_ITEM.to_string(),
                story_service_url: DEFAULT_STORY_SERVICE_URL.to_string(),
                item_data_url: DEFAULT_ITEM_DATA_URL.to_string(),
                extent_buffer: DEFAULT_EXTENT_BUFFER,
                debug_redirect_delay: DEFAULT_DEBUG_REDIRECT_DELAY_SECS,
            },
            location: LocationSettings {
                fallback: FallbackMode::Random,
                fallback_codes: default_fallback_codes(),
                fixed_code: default_fallback_code(),
                geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
                geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT_SECS,
                reverse_geocode: true,
            },
            search: SearchSettings {
                geocode_url: DEFAULT_GEOCODE_URL.to_string(),
                token: None,
                debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
                min_chars: DEFAULT_SEARCH_MIN_CHARS,
                max_locations: DEFAULT_SEARCH_MAX_LOCATIONS,
                country_code: DEFAULT_SEARCH_COUNTRY_CODE.to_string(),
            },
            logging: LoggingSettings {
                directory: super::file::config_directory().join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}
