//! Real network transport backed by reqwest

use std::time::Duration;

use tracing::{debug, trace, warn};

use super::types::{BoxFuture, Fetch, FetchError, FetchRequest, FetchResponse, FetchTarget};

/// Default User-Agent string for outgoing requests.
const DEFAULT_USER_AGENT: &str = concat!("localstory/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetch implementation using an async reqwest client.
///
/// This is the "real" network primitive that the fetch slot wraps.
#[derive(Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Creates a new ReqwestFetch with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestFetch with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(DEFAULT_USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    fn build(&self, request: &FetchRequest) -> Result<reqwest::RequestBuilder, FetchError> {
        let (method, url, mut headers, mut body) = match &request.target {
            FetchTarget::Url(url) => ("GET".to_string(), url.clone(), Vec::new(), None),
            FetchTarget::Prepared(prepared) => (
                prepared.method.clone(),
                prepared.url.clone(),
                prepared.headers.clone(),
                prepared.body.clone(),
            ),
        };

        let method = request.options.method.clone().unwrap_or(method);
        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes()).map_err(|e| {
            FetchError::Transport {
                url: url.clone(),
                reason: format!("Invalid method '{}': {}", method, e),
            }
        })?;

        headers.extend(request.options.headers.iter().cloned());
        if request.options.body.is_some() {
            body = request.options.body.clone();
        }

        let mut builder = self.client.request(method, &url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(builder)
    }

    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url().to_string();
        trace!(url = %url, "HTTP request starting");

        let response = match self.build(request)?.send().await {
            Ok(resp) => {
                debug!(
                    url = %url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(FetchError::Transport {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        match response.bytes().await {
            Ok(body) => {
                trace!(url = %url, bytes = body.len(), "HTTP response body read");
                Ok(FetchResponse::new(status, headers, body))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read response body");
                Err(FetchError::Transport {
                    url,
                    reason: format!("Failed to read response: {}", e),
                })
            }
        }
    }
}

impl Fetch for ReqwestFetch {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse, FetchError>> {
        Box::pin(async move {
            match request.options.signal.clone() {
                Some(signal) => {
                    tokio::select! {
                        biased;
                        _ = signal.cancelled() => {
                            debug!(url = request.url(), "HTTP request cancelled");
                            Err(FetchError::Cancelled(request.url().to_string()))
                        }
                        result = self.send(&request) => result,
                    }
                }
                None => self.send(&request).await,
            }
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Mock fetch for testing.
    ///
    /// Responses are routed by URL substring in registration order; every
    /// request is recorded.
    #[derive(Clone, Default)]
    pub struct MockFetch {
        routes: Arc<Mutex<Vec<(String, Result<FetchResponse, String>)>>>,
        requests: Arc<Mutex<Vec<FetchRequest>>>,
    }

    impl MockFetch {
        pub fn new() -> Self {
            Self::default()
        }

        /// Responds to URLs containing `pattern` with a 200 JSON body.
        pub fn json(self, pattern: &str, body: serde_json::Value) -> Self {
            self.respond(pattern, FetchResponse::json_ok(body.to_string()))
        }

        /// Responds to URLs containing `pattern` with the given response.
        pub fn respond(self, pattern: &str, response: FetchResponse) -> Self {
            self.routes
                .lock()
                .push((pattern.to_string(), Ok(response)));
            self
        }

        /// Fails requests to URLs containing `pattern` with a transport error.
        pub fn fail(self, pattern: &str, reason: &str) -> Self {
            self.routes
                .lock()
                .push((pattern.to_string(), Err(reason.to_string())));
            self
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().clone()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .iter()
                .map(|r| r.url().to_string())
                .collect()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl Fetch for MockFetch {
        fn fetch(
            &self,
            request: FetchRequest,
        ) -> BoxFuture<'_, Result<FetchResponse, FetchError>> {
            let url = request.url().to_string();
            self.requests.lock().push(request);
            let route = self
                .routes
                .lock()
                .iter()
                .find(|(pattern, _)| url.contains(pattern.as_str()))
                .map(|(_, result)| result.clone());

            Box::pin(async move {
                match route {
                    Some(Ok(response)) => Ok(response),
                    Some(Err(reason)) => Err(FetchError::Transport { url, reason }),
                    None => Ok(FetchResponse::new(404, vec![], "not found")),
                }
            })
        }
    }

    #[tokio::test]
    async fn test_mock_fetch_routes_by_substring() {
        let mock = MockFetch::new()
            .json("alpha", serde_json::json!({"name": "alpha"}))
            .fail("beta", "connection refused");

        let ok = mock.fetch(FetchRequest::get("http://x/alpha/1")).await.unwrap();
        assert_eq!(ok.status(), 200);

        let err = mock.fetch(FetchRequest::get("http://x/beta")).await;
        assert!(matches!(err, Err(FetchError::Transport { .. })));

        let missing = mock.fetch(FetchRequest::get("http://x/gamma")).await.unwrap();
        assert_eq!(missing.status(), 404);

        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_reqwest_fetch_builds() {
        assert!(ReqwestFetch::new().is_ok());
        assert!(ReqwestFetch::with_timeout(5).is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_signal_short_circuits() {
        let fetch = ReqwestFetch::new().unwrap();
        let signal = tokio_util::sync::CancellationToken::new();
        signal.cancel();

        let result = fetch
            .fetch(FetchRequest::get("http://127.0.0.1:9/never").with_signal(signal))
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled(_))));
    }
}
