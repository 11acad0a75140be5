//! Location resolution for a story session.
//!
//! A page load is either *resolving* (no usable location in its URL) or
//! *rendering*. Resolving passes run the [`LocationResolver`] strategies and end
//! in a [`Redirect`] that puts the location into the URL, so every rendered
//! session is reproducible from its address alone.

mod geolocation;
mod resolver;
mod session;

pub use geolocation::{FixedGeolocator, GeolocationError, Geolocator, IpGeolocator, PositionOptions};
pub use resolver::{FallbackPolicy, LocationResolver, Resolution, ResolutionSource, ReverseLookup};
pub use session::{
    PageState, Redirect, SessionUrl, SessionUrlError, DEBUG_PARAM, LOCATION_ALIAS, LOCATION_PARAM,
    SCROLL_PARAM,
};
