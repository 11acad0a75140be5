//! Trailing-edge debounced address search.
//!
//! Each [`DebouncedSearch::input`] restarts a single timer. When the timer
//! fires, the current text is searched on its own task, so later keystrokes
//! never cancel a request in flight; instead every issued search carries a
//! generation number and only the latest generation may publish results.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::candidates::{Candidate, CandidateSource};
use crate::config::{SearchSettings, DEFAULT_SEARCH_DEBOUNCE_MS, DEFAULT_SEARCH_MIN_CHARS};

/// Debounce timing and query threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub debounce: Duration,
    /// Queries shorter than this (after trimming) are not sent.
    pub min_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            min_chars: DEFAULT_SEARCH_MIN_CHARS,
        }
    }
}

impl SearchConfig {
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            min_chars: settings.min_chars,
        }
    }
}

/// How a search session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Selected(Candidate),
    Cancelled,
}

type CompletionFn = Box<dyn FnOnce(SearchOutcome) + Send>;

#[derive(Default)]
struct DebounceState {
    query: String,
    timer: Option<JoinHandle<()>>,
    /// Incremented on every input; a firing timer must match it.
    timer_seq: u64,
    /// Generation of the most recently issued search.
    generation: u64,
    closed: bool,
}

struct Inner {
    source: Arc<dyn CandidateSource>,
    config: SearchConfig,
    state: Mutex<DebounceState>,
    results: watch::Sender<Vec<Candidate>>,
    on_complete: Mutex<Option<CompletionFn>>,
}

/// A type-ahead address search session.
///
/// Must be driven from within a tokio runtime.
pub struct DebouncedSearch {
    inner: Arc<Inner>,
}

impl DebouncedSearch {
    /// Starts a session. `on_complete` runs exactly once, on select or cancel.
    pub fn new<F>(source: Arc<dyn CandidateSource>, config: SearchConfig, on_complete: F) -> Self
    where
        F: FnOnce(SearchOutcome) + Send + 'static,
    {
        let (results, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                state: Mutex::new(DebounceState::default()),
                results,
                on_complete: Mutex::new(Some(Box::new(on_complete))),
            }),
        }
    }

    /// Records new text and restarts the debounce timer.
    pub fn input(&self, text: impl Into<String>) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.query = text.into();
        state.timer_seq += 1;

        let seq = state.timer_seq;
        let inner = self.inner.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.config.debounce).await;
            Inner::fire(&inner, seq);
        }));
    }

    /// Receiver of published result lists.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Candidate>> {
        self.inner.results.subscribe()
    }

    /// The most recently published results.
    pub fn results(&self) -> Vec<Candidate> {
        self.inner.results.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Ends the session with a chosen candidate.
    pub fn select(&self, candidate: Candidate) {
        self.complete(SearchOutcome::Selected(candidate));
    }

    /// Ends the session without a choice.
    pub fn cancel(&self) {
        self.complete(SearchOutcome::Cancelled);
    }

    fn complete(&self, outcome: SearchOutcome) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
        }

        if let Some(callback) = self.inner.on_complete.lock().take() {
            callback(outcome);
        }
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.closed = true;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl Inner {
    fn fire(inner: &Arc<Inner>, seq: u64) {
        let mut state = inner.state.lock();
        if state.closed || state.timer_seq != seq {
            return;
        }
        state.timer = None;

        let text = state.query.trim().to_string();
        state.generation += 1;
        let generation = state.generation;

        if text.chars().count() < inner.config.min_chars {
            debug!(query = %text, "Query below minimum length, clearing results");
            inner.results.send_replace(Vec::new());
            return;
        }
        drop(state);

        debug!(query = %text, generation, "Issuing address search");
        let task = inner.clone();
        tokio::spawn(async move {
            let result = task.source.search(text.clone()).await;
            task.publish(generation, &text, result);
        });
    }

    fn publish(
        &self,
        generation: u64,
        text: &str,
        result: Result<Vec<Candidate>, super::SearchError>,
    ) {
        let state = self.state.lock();
        if state.closed || state.generation != generation {
            debug!(query = %text, generation, latest = state.generation, "Discarding stale search results");
            return;
        }

        let candidates = result.unwrap_or_else(|e| {
            warn!(query = %text, error = %e, "Address search failed");
            Vec::new()
        });
        self.results.send_replace(candidates);
    }
}
