//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::settings::ConfigFile;
use crate::geo::AreaCode;

/// A rejected value, not yet tied to the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct InvalidValue {
    pub section: String,
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, InvalidValue> {
    let mut config = ConfigFile::default();

    // [services] section
    if let Some(section) = ini.section(Some("services")) {
        if let Some(v) = non_empty(section.get("local_url")) {
            config.services.local_url = parse_url("services", "local_url", v)?;
        }
        if let Some(v) = non_empty(section.get("regional_url")) {
            config.services.regional_url = parse_url("services", "regional_url", v)?;
        }
        if let Some(v) = non_empty(section.get("national_url")) {
            config.services.national_url = parse_url("services", "national_url", v)?;
        }
        if let Some(v) = non_empty(section.get("local_id_field")) {
            config.services.local_id_field = v.to_string();
        }
        if let Some(v) = non_empty(section.get("parent_field")) {
            config.services.parent_field = v.to_string();
        }
        if let Some(v) = non_empty(section.get("national_code")) {
            config.services.national_code = v.to_string();
        }
        if let Some(v) = section.get("timeout") {
            config.services.timeout = parse_positive("services", "timeout", v, "seconds")?;
        }
    }

    // [story] section
    if let Some(section) = ini.section(Some("story")) {
        if let Some(v) = non_empty(section.get("page_url")) {
            config.story.page_url = parse_url("story", "page_url", v)?;
        }
        if let Some(v) = non_empty(section.get("story_id")) {
            config.story.story_id = v.to_string();
        }
        if let Some(v) = non_empty(section.get("content_map_item")) {
            config.story.content_map_item = v.to_string();
        }
        if let Some(v) = non_empty(section.get("locator_map_item")) {
            config.story.locator_map_item = v.to_string();
        }
        if let Some(v) = non_empty(section.get("story_service_url")) {
            config.story.story_service_url = parse_url("story", "story_service_url", v)?;
        }
        if let Some(v) = non_empty(section.get("item_data_url")) {
            config.story.item_data_url = parse_url("story", "item_data_url", v)?;
        }
        if let Some(v) = section.get("extent_buffer") {
            config.story.extent_buffer = v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|b| b.is_finite() && *b >= 0.0)
                .ok_or_else(|| invalid("story", "extent_buffer", v, "must be a non-negative number (degrees)"))?;
        }
        if let Some(v) = section.get("debug_redirect_delay") {
            config.story.debug_redirect_delay = v
                .trim()
                .parse()
                .map_err(|_| invalid("story", "debug_redirect_delay", v, "must be an integer (seconds)"))?;
        }
    }

    // [location] section
    if let Some(section) = ini.section(Some("location")) {
        if let Some(v) = section.get("fallback") {
            config.location.fallback = FromStr::from_str(v)
                .map_err(|_| invalid("location", "fallback", v, "must be 'random' or 'fixed'"))?;
        }
        if let Some(v) = section.get("fallback_codes") {
            let codes = parse_codes(v)
                .map_err(|bad| invalid("location", "fallback_codes", &bad, "must be five-digit ZIP codes separated by commas"))?;
            config.location.fallback_codes = codes;
        }
        if let Some(v) = non_empty(section.get("fixed_code")) {
            config.location.fixed_code = AreaCode::new(v)
                .map_err(|_| invalid("location", "fixed_code", v, "must be a five-digit ZIP code"))?;
        }
        if let Some(v) = non_empty(section.get("geolocation_url")) {
            config.location.geolocation_url = parse_url("location", "geolocation_url", v)?;
        }
        if let Some(v) = section.get("geolocation_timeout") {
            config.location.geolocation_timeout =
                parse_positive("location", "geolocation_timeout", v, "seconds")?;
        }
        if let Some(v) = section.get("reverse_geocode") {
            config.location.reverse_geocode = parse_bool(v);
        }
    }

    // [search] section
    if let Some(section) = ini.section(Some("search")) {
        if let Some(v) = non_empty(section.get("geocode_url")) {
            config.search.geocode_url = parse_url("search", "geocode_url", v)?;
        }
        if let Some(v) = section.get("token") {
            let v = v.trim();
            config.search.token = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = section.get("debounce_ms") {
            config.search.debounce_ms = v
                .trim()
                .parse()
                .map_err(|_| invalid("search", "debounce_ms", v, "must be an integer (milliseconds)"))?;
        }
        if let Some(v) = section.get("min_chars") {
            config.search.min_chars = v
                .trim()
                .parse()
                .map_err(|_| invalid("search", "min_chars", v, "must be a non-negative integer"))?;
        }
        if let Some(v) = section.get("max_locations") {
            config.search.max_locations =
                parse_positive("search", "max_locations", v, "candidates")? as u32;
        }
        if let Some(v) = non_empty(section.get("country_code")) {
            config.search.country_code = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
        if let Some(v) = non_empty(section.get("level")) {
            let v = v.to_lowercase();
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&v.as_str()) {
                return Err(InvalidValue {
                    section: "logging".to_string(),
                    key: "level".to_string(),
                    value: v,
                    reason: "must be one of: trace, debug, info, warn, error".to_string(),
                });
            }
            config.logging.level = v;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> InvalidValue {
    InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Service and page URLs must be absolute http(s) URLs.
fn parse_url(section: &str, key: &str, value: &str) -> Result<String, InvalidValue> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| invalid(section, key, value, &format!("must be an absolute URL ({})", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        scheme => Err(invalid(
            section,
            key,
            value,
            &format!("must use http or https, not '{}'", scheme),
        )),
    }
}

fn parse_positive(section: &str, key: &str, value: &str, unit: &str) -> Result<u64, InvalidValue> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid(section, key, value, &format!("must be a positive integer ({})", unit)))
}

/// Parses a comma-separated code list, returning the first bad entry on failure.
fn parse_codes(value: &str) -> Result<Vec<AreaCode>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| AreaCode::new(c).map_err(|_| c.to_string()))
        .collect()
}

/// Parse a boolean value from a config string.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_partial_config() {
        let config = load(
            r#"
[story]
story_id = abc123

[search]
debounce_ms = 150
"#,
        )
        .unwrap();

        assert_eq!(config.story.story_id, "abc123");
        assert_eq!(config.search.debounce_ms, 150);
        assert_eq!(config.story.content_map_item, DEFAULT_CONTENT_MAP_ITEM);
        assert_eq!(config.services.local_url, DEFAULT_LOCAL_SERVICE_URL);
        assert_eq!(config.search.min_chars, DEFAULT_SEARCH_MIN_CHARS);
    }

    #[test]
    fn test_fallback_settings() {
        let config = load(
            r#"
[location]
fallback = fixed
fixed_code = 10001
fallback_codes = 92373, 02134
reverse_geocode = no
"#,
        )
        .unwrap();

        assert_eq!(config.location.fallback, FallbackMode::Fixed);
        assert_eq!(config.location.fixed_code.as_str(), "10001");
        let codes: Vec<&str> = config
            .location
            .fallback_codes
            .iter()
            .map(|c| c.as_str())
            .collect();
        assert_eq!(codes, vec!["92373", "02134"]);
        assert!(!config.location.reverse_geocode);
    }

    #[test]
    fn test_invalid_fallback_code() {
        let err = load(
            r#"
[location]
fallback_codes = 92373, 9x373
"#,
        )
        .unwrap_err();

        match err {
            ConfigFileError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "fallback_codes");
                assert_eq!(value, "9x373");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_fallback_mode() {
        let err = load("[location]\nfallback = sometimes\n").unwrap_err();
        assert!(err.to_string().contains("must be 'random' or 'fixed'"));
    }

    #[test]
    fn test_invalid_url() {
        let err = load("[services]\nlocal_url = not a url\n").unwrap_err();
        assert!(err.to_string().contains("services.local_url"));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let err = load("[story]\npage_url = file:///tmp/story.html\n").unwrap_err();
        assert!(err.to_string().contains("story.page_url"));
        assert!(err.to_string().contains("must use http or https"));

        let config = load("[story]\npage_url = http://localhost:8080/story\n").unwrap();
        assert_eq!(config.story.page_url, "http://localhost:8080/story");
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(load("[services]\ntimeout = 0\n").is_err());
        assert!(load("[location]\ngeolocation_timeout = soon\n").is_err());
    }

    #[test]
    fn test_negative_buffer_rejected() {
        assert!(load("[story]\nextent_buffer = -0.1\n").is_err());
        let config = load("[story]\nextent_buffer = 0.1\n").unwrap();
        assert_eq!(config.story.extent_buffer, 0.1);
    }

    #[test]
    fn test_empty_token_is_none() {
        let config = load("[search]\ntoken =\n").unwrap();
        assert!(config.search.token.is_none());

        let config = load("[search]\ntoken = abc\n").unwrap();
        assert_eq!(config.search.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = load("[logging]\nlevel = loud\n").unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/logs");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs"));
        }
        assert_eq!(expand_tilde("/var/log"), PathBuf::from("/var/log"));
    }

    #[test]
    fn test_parse_bool_values() {
        for v in ["true", "TRUE", "yes", "1", "on", " On "] {
            assert!(parse_bool(v), "{} should be true", v);
        }
        for v in ["false", "no", "0", "off", "", "maybe"] {
            assert!(!parse_bool(v), "{} should be false", v);
        }
    }
}
