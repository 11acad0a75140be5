//! The process-wide fetch entry point.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use super::intercept::InterceptingFetch;
use super::types::{BoxFuture, Fetch, FetchError, FetchRequest, FetchResponse};
use crate::rules::RuleSet;

/// Errors from installing an interceptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// An interceptor is already installed; installing again would double-wrap.
    #[error("A substitution interceptor is already installed")]
    AlreadyInstalled,
}

/// Owner of the fetch entry point that every consumer calls through.
///
/// The slot keeps a reference to the real transport and swaps the current
/// entry point between the real transport and a single [`InterceptingFetch`]
/// wrapping it. The interceptor always wraps the real transport, never the
/// current entry point, so installs cannot stack.
pub struct FetchSlot {
    real: Arc<dyn Fetch>,
    current: RwLock<Current>,
}

struct Current {
    entry: Arc<dyn Fetch>,
    installed: bool,
}

impl FetchSlot {
    /// Creates a slot whose entry point is the real transport.
    pub fn new(real: Arc<dyn Fetch>) -> Self {
        Self {
            current: RwLock::new(Current {
                entry: Arc::clone(&real),
                installed: false,
            }),
            real,
        }
    }

    /// Installs the substitution rules.
    ///
    /// Must happen before any consumer whose fetches should be rewritten
    /// starts issuing requests.
    pub fn install(&self, rules: RuleSet) -> Result<(), SlotError> {
        let mut current = self.current.write();
        if current.installed {
            return Err(SlotError::AlreadyInstalled);
        }

        let rule_count = rules.len();
        current.entry = Arc::new(InterceptingFetch::new(
            Arc::clone(&self.real),
            Arc::new(rules),
        ));
        current.installed = true;

        info!(rules = rule_count, "Substitution interceptor installed");
        Ok(())
    }

    /// Restores the real transport as the entry point.
    pub fn teardown(&self) {
        let mut current = self.current.write();
        if current.installed {
            current.entry = Arc::clone(&self.real);
            current.installed = false;
            debug!("Substitution interceptor removed");
        }
    }

    /// Whether an interceptor is currently installed.
    pub fn is_installed(&self) -> bool {
        self.current.read().installed
    }

    /// The unwrapped transport.
    pub fn real(&self) -> Arc<dyn Fetch> {
        Arc::clone(&self.real)
    }

    fn entry(&self) -> Arc<dyn Fetch> {
        Arc::clone(&self.current.read().entry)
    }
}

impl Fetch for FetchSlot {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse, FetchError>> {
        let entry = self.entry();
        Box::pin(async move { entry.fetch(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::MockFetch;
    use crate::rules::SubstitutionRule;
    use serde_json::{json, Value};

    fn counter_rules() -> RuleSet {
        RuleSet::new().with(SubstitutionRule::new("count", "/doc", |doc| {
            let n = doc["count"].as_i64().unwrap_or(0);
            doc["count"] = json!(n + 1);
            Ok(())
        }))
    }

    async fn count(slot: &FetchSlot) -> i64 {
        let response = slot.fetch(FetchRequest::get("https://host/doc")).await.unwrap();
        response.json::<Value>().unwrap()["count"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_slot_passes_through_before_install() {
        let mock = MockFetch::new().json("/doc", json!({"count": 0}));
        let slot = FetchSlot::new(Arc::new(mock));

        assert!(!slot.is_installed());
        assert_eq!(count(&slot).await, 0);
    }

    #[tokio::test]
    async fn test_install_rewrites_and_teardown_restores() {
        let mock = MockFetch::new().json("/doc", json!({"count": 0}));
        let slot = FetchSlot::new(Arc::new(mock));

        slot.install(counter_rules()).unwrap();
        assert!(slot.is_installed());
        assert_eq!(count(&slot).await, 1);

        slot.teardown();
        assert!(!slot.is_installed());
        assert_eq!(count(&slot).await, 0);
    }

    #[tokio::test]
    async fn test_double_install_is_rejected() {
        let mock = MockFetch::new().json("/doc", json!({"count": 0}));
        let slot = FetchSlot::new(Arc::new(mock));

        slot.install(counter_rules()).unwrap();
        assert_eq!(
            slot.install(counter_rules()),
            Err(SlotError::AlreadyInstalled)
        );

        // Still wrapped exactly once
        assert_eq!(count(&slot).await, 1);
    }

    #[tokio::test]
    async fn test_reinstall_after_teardown_wraps_once() {
        let mock = MockFetch::new().json("/doc", json!({"count": 0}));
        let slot = FetchSlot::new(Arc::new(mock));

        slot.install(counter_rules()).unwrap();
        slot.teardown();
        slot.install(counter_rules()).unwrap();

        assert_eq!(count(&slot).await, 1);
    }
}
