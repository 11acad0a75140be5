//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let fallback_codes = config
        .location
        .fallback_codes
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let token = config.search.token.as_deref().unwrap_or("");
    let reverse_geocode = if config.location.reverse_geocode {
        "true"
    } else {
        "false"
    };

    format!(
        r#"[services]
; Census demographics feature services (ArcGIS FeatureServer layers)
local_url = {}
regional_url = {}
national_url = {}
; Identifier field of the local (ZIP code) layer
local_id_field = {}
; Parent-region field; keys the regional and national lookups
parent_field = {}
; Key of the single national feature
national_code = {}
; Timeout in seconds for HTTP requests (default: 30)
timeout = {}

[story]
; Host page that location redirects point at
page_url = {}
; Story and web map items whose documents are rewritten
story_id = {}
content_map_item = {}
locator_map_item = {}
story_service_url = {}
item_data_url = {}
; Degrees added to each side of the local extent (default: 0.05)
extent_buffer = {}
; Redirect delay in seconds when the page carries the debug flag (default: 3)
debug_redirect_delay = {}

[location]
; Fallback when no location parameter or position fix is available:
;   random - pick uniformly from fallback_codes
;   fixed  - always use fixed_code
fallback = {}
fallback_codes = {}
fixed_code = {}
; IP geolocation endpoint used as the position source
geolocation_url = {}
; Position fix timeout in seconds (default: 10)
geolocation_timeout = {}
; Resolve a position fix to its ZIP code before redirecting (default: true)
reverse_geocode = {}

[search]
; Geocode service root; /findAddressCandidates is appended
geocode_url = {}
; Access token for the geocode service (optional)
token = {}
; Delay after the last keystroke before searching, in milliseconds (default: 300)
debounce_ms = {}
; Minimum query length before searching (default: 3)
min_chars = {}
max_locations = {}
country_code = {}

[logging]
; Directory for log files
directory = {}
; Log file name (cleared on each start)
file = {}
; Default level when RUST_LOG is not set: trace, debug, info, warn, error
level = {}
"#,
        config.services.local_url,
        config.services.regional_url,
        config.services.national_url,
        config.services.local_id_field,
        config.services.parent_field,
        config.services.national_code,
        config.services.timeout,
        config.story.page_url,
        config.story.story_id,
        config.story.content_map_item,
        config.story.locator_map_item,
        config.story.story_service_url,
        config.story.item_data_url,
        config.story.extent_buffer,
        config.story.debug_redirect_delay,
        config.location.fallback,
        fallback_codes,
        config.location.fixed_code,
        config.location.geolocation_url,
        config.location.geolocation_timeout,
        reverse_geocode,
        config.search.geocode_url,
        token,
        config.search.debounce_ms,
        config.search.min_chars,
        config.search.max_locations,
        config.search.country_code,
        path_to_string(&config.logging.directory),
        config.logging.file,
        config.logging.level,
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
