//! Response interception layer.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use super::types::{BoxFuture, Fetch, FetchError, FetchRequest, FetchResponse, FetchTarget};
use crate::rules::RuleSet;

/// Fetch wrapper that rewrites JSON responses matching a rule pattern.
///
/// Requests whose target is a plain URL are matched against the rule set
/// (first match wins). A matching response is parsed from a clone, deep
/// copied, mutated, and returned as a synthetic `200 OK` JSON response.
/// Everything else is delegated to the inner fetch unchanged.
pub struct InterceptingFetch {
    inner: Arc<dyn Fetch>,
    rules: Arc<RuleSet>,
}

impl InterceptingFetch {
    pub fn new(inner: Arc<dyn Fetch>, rules: Arc<RuleSet>) -> Self {
        Self { inner, rules }
    }

    /// The rules this interceptor applies.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl Fetch for InterceptingFetch {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse, FetchError>> {
        let url = match &request.target {
            FetchTarget::Url(url) => url.clone(),
            FetchTarget::Prepared(_) => return self.inner.fetch(request),
        };

        let Some(rule) = self.rules.first_match(&url) else {
            trace!(url = %url, "No substitution rule matched, passing through");
            return self.inner.fetch(request);
        };

        Box::pin(async move {
            let response = self.inner.fetch(request).await?;

            let original: Value =
                response
                    .clone()
                    .json()
                    .map_err(|e| FetchError::InvalidJson {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
            let mut modified = original.clone();

            debug!(rule = rule.name(), url = %url, "Applying substitution rule");
            rule.apply(&mut modified)
                .map_err(|source| FetchError::Mutation {
                    rule: rule.name().to_string(),
                    url: url.clone(),
                    source,
                })?;

            let body = serde_json::to_vec(&modified).map_err(|e| FetchError::InvalidJson {
                url: url.clone(),
                reason: e.to_string(),
            })?;

            Ok(FetchResponse::json_ok(body))
        })
    }
}
