//! Fetch types and traits

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::rules::MutationError;

/// Boxed future returned by dyn-compatible async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The request's cancellation signal fired before it completed.
    #[error("Request to {0} was cancelled")]
    Cancelled(String),

    /// An intercepted response body was not valid JSON.
    #[error("Response from {url} is not valid JSON: {reason}")]
    InvalidJson { url: String, reason: String },

    /// A substitution rule failed while rewriting an intercepted response.
    #[error("Substitution rule '{rule}' failed for {url}: {source}")]
    Mutation {
        rule: String,
        url: String,
        #[source]
        source: MutationError,
    },
}

/// A fully described request, as opposed to a bare URL string.
///
/// Requests of this form are never matched against substitution rules.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl PreparedRequest {
    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }
}

/// The first argument of a fetch call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    /// A plain URL string.
    Url(String),
    /// A prepared request object.
    Prepared(PreparedRequest),
}

impl FetchTarget {
    /// Returns the URL this target points at.
    pub fn url(&self) -> &str {
        match self {
            FetchTarget::Url(url) => url,
            FetchTarget::Prepared(request) => &request.url,
        }
    }
}

/// Options passed alongside a fetch target.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// HTTP method override (defaults to GET, or the prepared request's method).
    pub method: Option<String>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Abort signal; cancelling it abandons the request.
    pub signal: Option<CancellationToken>,
}

/// A single fetch call: target plus options.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub target: FetchTarget,
    pub options: FetchOptions,
}

impl FetchRequest {
    /// Creates a plain GET request for a URL string.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            target: FetchTarget::Url(url.into()),
            options: FetchOptions::default(),
        }
    }

    /// Creates a request from a prepared request object.
    pub fn prepared(request: PreparedRequest) -> Self {
        Self {
            target: FetchTarget::Prepared(request),
            options: FetchOptions::default(),
        }
    }

    /// Attaches a cancellation signal.
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.options.signal = Some(signal);
        self
    }

    /// Returns the target URL.
    pub fn url(&self) -> &str {
        self.target.url()
    }
}

/// A fetch response.
///
/// The body is held as [`Bytes`], so cloning a response never consumes or
/// copies the body of the original.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl FetchResponse {
    /// Creates a response with the given status, headers and body.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a synthetic `200 OK` JSON response.
    pub fn json_ok(body: impl Into<Bytes>) -> Self {
        Self::new(
            200,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        )
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers in arrival order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Looks up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// The network-fetch primitive.
///
/// Everything that talks to the network goes through this trait, so the
/// interception layer can wrap any implementation transparently.
pub trait Fetch: Send + Sync {
    /// Performs a fetch call.
    ///
    /// Like a browser `fetch`, a non-2xx status is a successful call; only
    /// transport failures are errors.
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse, FetchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url() {
        assert_eq!(FetchTarget::Url("http://a/b".into()).url(), "http://a/b");
        assert_eq!(
            FetchTarget::Prepared(PreparedRequest::get("http://c/d")).url(),
            "http://c/d"
        );
    }

    #[test]
    fn test_json_ok_response() {
        let response = FetchResponse::json_ok(r#"{"a":1}"#);
        assert_eq!(response.status(), 200);
        assert!(response.is_ok());
        assert_eq!(response.header("content-type"), Some("application/json"));

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_clone_keeps_original_body() {
        let original = FetchResponse::new(404, vec![], "not found");
        let copy = original.clone();
        assert!(!copy.is_ok());
        assert_eq!(original.body(), copy.body());
        assert_eq!(original.body().as_ref(), b"not found");
    }
}
