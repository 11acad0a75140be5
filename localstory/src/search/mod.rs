//! Type-ahead address search.
//!
//! [`DebouncedSearch`] turns a stream of keystrokes into at most one candidate
//! lookup per pause in typing; [`GeocodeClient`] is the production
//! [`CandidateSource`].

mod candidates;
mod debounce;

pub use candidates::{Candidate, CandidateLocation, CandidateSource, GeocodeClient, SearchError};
pub use debounce::{DebouncedSearch, SearchConfig, SearchOutcome};
