//! Network fetch abstraction and the response interception layer.
//!
//! All network access goes through the [`Fetch`] trait. The real transport is
//! [`ReqwestFetch`]; consumers call through a [`FetchSlot`], which can have a
//! substitution interceptor installed exactly once:
//!
//! ```ignore
//! use std::sync::Arc;
//! use localstory::fetch::{FetchSlot, ReqwestFetch};
//!
//! let slot = FetchSlot::new(Arc::new(ReqwestFetch::new()?));
//! slot.install(rules)?;
//! // every fetch through `slot` is now subject to the rules
//! ```

mod http;
mod intercept;
mod slot;
mod types;

pub use http::{ReqwestFetch, DEFAULT_TIMEOUT_SECS};
pub use intercept::InterceptingFetch;
pub use slot::{FetchSlot, SlotError};
pub use types::{
    BoxFuture, Fetch, FetchError, FetchOptions, FetchRequest, FetchResponse, FetchTarget,
    PreparedRequest,
};

#[cfg(test)]
pub use http::tests;
