//! The page URL contract.
//!
//! A session is identified entirely by its page URL: the `location` parameter
//! (or its `zip` alias) carries the resolved query, `debug` enables verbose
//! diagnostics and `scroll` asks the consumer to jump to the location picker.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::geo::LocationQuery;

/// Primary location parameter.
pub const LOCATION_PARAM: &str = "location";
/// Accepted alias of [`LOCATION_PARAM`].
pub const LOCATION_ALIAS: &str = "zip";
pub const DEBUG_PARAM: &str = "debug";
pub const SCROLL_PARAM: &str = "scroll";

/// Malformed page URL.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid page URL '{url}': {reason}")]
pub struct SessionUrlError {
    pub url: String,
    pub reason: String,
}

/// Which pass a page load is in.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    /// No usable location yet; the pass ends in a redirect.
    Resolving,
    /// The URL carries a location; the story is rendered for it.
    Rendering(LocationQuery),
}

/// A parsed page URL.
#[derive(Debug, Clone)]
pub struct SessionUrl {
    url: reqwest::Url,
    /// Non-empty `location` then `zip` values, in that order.
    locations: Vec<String>,
    debug: bool,
    scroll: bool,
}

impl SessionUrl {
    pub fn parse(url: &str) -> Result<Self, SessionUrlError> {
        let url = reqwest::Url::parse(url).map_err(|e| SessionUrlError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut location = None;
        let mut alias = None;
        let mut debug = false;
        let mut scroll = false;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                LOCATION_PARAM if location.is_none() => location = Some(value.into_owned()),
                LOCATION_ALIAS if alias.is_none() => alias = Some(value.into_owned()),
                DEBUG_PARAM => debug = true,
                SCROLL_PARAM => scroll = true,
                _ => {}
            }
        }

        let locations = [location, alias]
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .collect();

        Ok(Self {
            locations,
            url,
            debug,
            scroll,
        })
    }

    /// Raw location parameter, if present.
    pub fn location_param(&self) -> Option<&str> {
        self.locations.first().map(String::as_str)
    }

    /// The first location parameter that validates as a query.
    ///
    /// `location` is tried before `zip`; invalid values are logged and skipped.
    pub fn query(&self) -> Option<LocationQuery> {
        self.locations
            .iter()
            .find_map(|raw| match raw.parse::<LocationQuery>() {
                Ok(query) => Some(query),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Ignoring invalid location parameter");
                    None
                }
            })
    }

    pub fn state(&self) -> PageState {
        match self.query() {
            Some(query) => PageState::Rendering(query),
            None => PageState::Resolving,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn wants_scroll(&self) -> bool {
        self.scroll
    }

    /// The page URL without query or fragment.
    pub fn base(&self) -> String {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.to_string()
    }

    /// Builds the redirect that encodes `query` into this page's URL.
    ///
    /// The debug flag is carried over; in debug mode the redirect is delayed by
    /// `debug_delay` so diagnostics can be read.
    pub fn redirect_to(&self, query: &LocationQuery, scroll: bool, debug_delay: Duration) -> Redirect {
        let mut target = self.url.clone();
        target.set_fragment(None);

        let mut params = format!("{}={}", LOCATION_PARAM, encode(&query.to_string()));
        if self.debug {
            params.push('&');
            params.push_str(DEBUG_PARAM);
        }
        if scroll {
            params.push('&');
            params.push_str(SCROLL_PARAM);
        }
        target.set_query(Some(&params));

        Redirect {
            url: target.to_string(),
            delay: if self.debug { debug_delay } else { Duration::ZERO },
        }
    }
}

impl fmt::Display for SessionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn encode(value: &str) -> String {
    reqwest::Url::parse_with_params("http://x/", &[("v", value)])
        .ok()
        .and_then(|u| u.query().map(|q| q.trim_start_matches("v=").to_string()))
        .unwrap_or_else(|| value.to_string())
}

/// Instruction to reload the page at a new URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub url: String,
    pub delay: Duration,
}
