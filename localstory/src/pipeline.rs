//! The two-pass story session.
//!
//! A page load without a usable location resolves one and redirects; a page
//! load with a location aggregates its features, installs the substitution
//! rules on the fetch slot and hands back a [`RenderedSession`] through which
//! the story's documents are loaded.
//!
//! ```ignore
//! use std::sync::Arc;
//! use localstory::config::ConfigFile;
//! use localstory::fetch::{FetchSlot, ReqwestFetch};
//! use localstory::location::SessionUrl;
//! use localstory::pipeline::{PageOutcome, StoryPipeline};
//!
//! let real = Arc::new(ReqwestFetch::new()?);
//! let slot = Arc::new(FetchSlot::new(real.clone()));
//! let pipeline = StoryPipeline::from_config(&ConfigFile::load()?, real);
//!
//! match pipeline.run(&SessionUrl::parse(url)?, slot).await? {
//!     PageOutcome::Redirect(redirect) => println!("{}", redirect.url),
//!     PageOutcome::Rendered(session) => { session.load_story_documents().await?; }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregationError, FeatureAggregator, FeatureSet, ScopeServices};
use crate::config::ConfigFile;
use crate::fetch::{Fetch, FetchError, FetchRequest, FetchSlot, SlotError};
use crate::geo::{AreaCode, FeatureClient, GeoError, LocationQuery, ValidationError};
use crate::location::{
    FallbackPolicy, IpGeolocator, LocationResolver, PageState, PositionOptions, Redirect,
    ResolutionSource, ReverseLookup, SessionUrl, SessionUrlError,
};
use crate::rules::{story_rules, StoryProfile};
use crate::search::Candidate;

/// Session failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Url(#[from] SessionUrlError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to aggregate features for {query}: {source}")]
    Aggregation {
        query: LocationQuery,
        #[source]
        source: AggregationError,
    },

    #[error(transparent)]
    Slot(#[from] SlotError),

    /// Documents were requested through a slot with no rules installed.
    #[error("No substitution rules are installed")]
    NotInstalled,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A document could not be loaded as JSON.
    #[error("Failed to load document {url}: {reason}")]
    Document { url: String, reason: String },

    /// A user-entered area code has no feature.
    #[error("Unknown area code: {0}")]
    UnknownLocation(AreaCode),

    #[error(transparent)]
    Lookup(#[from] GeoError),

    /// A selected address is outside every local area.
    #[error("No area found for '{0}'")]
    NoAreaForSelection(String),
}

impl PipelineError {
    /// The single message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Aggregation {
                query,
                source: AggregationError::NotFound { .. },
            } => format!("No data found for ZIP code: {}", query),
            PipelineError::Aggregation { query, .. } => {
                format!("Error fetching data for ZIP code {}", query)
            }
            PipelineError::UnknownLocation(code) => format!("No data found for ZIP code: {}", code),
            PipelineError::Validation(ValidationError::InvalidAreaCode(value)) => {
                format!("Please enter a valid 5-digit ZIP code (got '{}')", value)
            }
            PipelineError::NoAreaForSelection(address) => {
                format!("No ZIP code found for {}", address)
            }
            PipelineError::Lookup(_) => "Error looking up ZIP code, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result of one page load.
pub enum PageOutcome {
    /// The location was resolved; reload at the redirect URL.
    Redirect(Redirect),
    /// The rules are installed and the story can load.
    Rendered(RenderedSession),
}

/// Runs story sessions against one configuration.
pub struct StoryPipeline {
    resolver: LocationResolver,
    aggregator: FeatureAggregator,
    profile: StoryProfile,
    debug_delay: Duration,
}

impl StoryPipeline {
    pub fn new(
        resolver: LocationResolver,
        aggregator: FeatureAggregator,
        profile: StoryProfile,
        debug_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            aggregator,
            profile,
            debug_delay,
        }
    }

    /// Builds the production pipeline. `fetch` should be the real transport,
    /// not the slot, so feature lookups are never rewritten.
    pub fn from_config(config: &ConfigFile, fetch: Arc<dyn Fetch>) -> Self {
        let client = FeatureClient::new(Arc::clone(&fetch));
        let services = ScopeServices::from_settings(&config.services);

        let reverse = config.location.reverse_geocode.then(|| ReverseLookup {
            client: client.clone(),
            service_url: services.local_url.clone(),
            id_field: services.local_id_field.clone(),
        });
        let geolocator = Arc::new(IpGeolocator::new(
            fetch,
            config.location.geolocation_url.clone(),
        ));
        let resolver = LocationResolver::new(
            geolocator,
            reverse,
            FallbackPolicy::from_settings(&config.location),
        )
        .with_options(PositionOptions {
            timeout: Duration::from_secs(config.location.geolocation_timeout),
            ..PositionOptions::default()
        });

        Self::new(
            resolver,
            FeatureAggregator::new(client, services),
            StoryProfile::from_settings(&config.story),
            Duration::from_secs(config.story.debug_redirect_delay),
        )
    }

    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    pub fn profile(&self) -> &StoryProfile {
        &self.profile
    }

    /// Runs one page load.
    pub async fn run(&self, url: &SessionUrl, slot: Arc<FetchSlot>) -> Result<PageOutcome, PipelineError> {
        match url.state() {
            PageState::Resolving => {
                let resolution = self.resolver.resolve(url).await;
                let redirect = url.redirect_to(&resolution.query, url.wants_scroll(), self.debug_delay);
                info!(
                    query = %resolution.query,
                    source = ?resolution.source,
                    url = %redirect.url,
                    "Location resolved, redirecting"
                );
                if url.is_debug() && resolution.source == ResolutionSource::Fallback {
                    debug!(policy = ?self.resolver.fallback(), "Fallback policy used");
                }
                Ok(PageOutcome::Redirect(redirect))
            }
            PageState::Rendering(query) => {
                let session = self.render(url, query, slot).await?;
                Ok(PageOutcome::Rendered(session))
            }
        }
    }

    async fn render(
        &self,
        url: &SessionUrl,
        query: LocationQuery,
        slot: Arc<FetchSlot>,
    ) -> Result<RenderedSession, PipelineError> {
        info!(query = %query, debug = url.is_debug(), "Rendering story");

        let features = self
            .aggregator
            .aggregate(&query)
            .await
            .map_err(|source| PipelineError::Aggregation {
                query: query.clone(),
                source,
            })?;

        slot.install(story_rules(&self.profile, &features))?;

        Ok(RenderedSession {
            query,
            features,
            scroll: url.wants_scroll(),
            debug: url.is_debug(),
            profile: self.profile.clone(),
            slot,
        })
    }

    /// Verifies a user-entered area code and redirects to it.
    pub async fn change_location(&self, url: &SessionUrl, input: &str) -> Result<Redirect, PipelineError> {
        let code = AreaCode::new(input.trim())?;
        let services = self.aggregator.services();

        let found = self
            .aggregator
            .client()
            .fetch_by_id(&services.local_url, &services.local_id_field, code.as_str(), false)
            .await?;
        if found.is_none() {
            warn!(code = %code, "Requested area code does not exist");
            return Err(PipelineError::UnknownLocation(code));
        }

        info!(code = %code, "Changing location");
        Ok(url.redirect_to(&LocationQuery::AreaCode(code), true, self.debug_delay))
    }

    /// Redirects to a random fallback location.
    pub fn surprise_me(&self, url: &SessionUrl) -> Redirect {
        let code = self.resolver.pick_fallback();
        info!(code = %code, "Surprise location picked");
        url.redirect_to(&LocationQuery::AreaCode(code), true, self.debug_delay)
    }

    /// Resolves a selected address candidate to its area and redirects to it.
    pub async fn select_candidate(
        &self,
        url: &SessionUrl,
        candidate: &Candidate,
    ) -> Result<Redirect, PipelineError> {
        let coordinate = candidate.coordinate()?;
        let services = self.aggregator.services();

        let feature = self
            .aggregator
            .client()
            .fetch_by_point(coordinate, &services.local_url, false)
            .await?
            .ok_or_else(|| PipelineError::NoAreaForSelection(candidate.address.clone()))?;

        let code = feature
            .attribute_str(&services.local_id_field)
            .and_then(|id| AreaCode::new(&id).ok())
            .ok_or_else(|| PipelineError::NoAreaForSelection(candidate.address.clone()))?;

        info!(address = %candidate.address, code = %code, "Address resolved to area");
        Ok(url.redirect_to(&LocationQuery::AreaCode(code), true, self.debug_delay))
    }
}

/// A rendered session. The rules stay installed until it is finished or dropped.
pub struct RenderedSession {
    query: LocationQuery,
    features: FeatureSet,
    scroll: bool,
    debug: bool,
    profile: StoryProfile,
    slot: Arc<FetchSlot>,
}

impl RenderedSession {
    pub fn query(&self) -> &LocationQuery {
        &self.query
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Whether the consumer should scroll to the location picker.
    pub fn scroll(&self) -> bool {
        self.scroll
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn slot(&self) -> &Arc<FetchSlot> {
        &self.slot
    }

    /// Loads one document through the slot.
    pub async fn load(&self, url: &str) -> Result<Value, PipelineError> {
        if !self.slot.is_installed() {
            return Err(PipelineError::NotInstalled);
        }

        let response = self.slot.fetch(FetchRequest::get(url)).await?;
        if !response.is_ok() {
            return Err(PipelineError::Document {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.json().map_err(|e| PipelineError::Document {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads the story data and both web maps, in that order.
    pub async fn load_story_documents(&self) -> Result<Vec<(String, Value)>, PipelineError> {
        let mut documents = Vec::new();
        for url in self.profile.document_urls() {
            let document = self.load(&url).await?;
            documents.push((url, document));
        }
        Ok(documents)
    }

    /// Removes the rules from the slot, ending the session.
    ///
    /// Dropping the session has the same effect.
    pub fn finish(self) {
        self.slot.teardown();
        debug!(query = %self.query, "Story session finished");
    }
}

impl Drop for RenderedSession {
    fn drop(&mut self) {
        self.slot.teardown();
    }
}
