//! LocalStory - Location-driven localization of embedded story documents
//!
//! This library resolves a visitor's location, fetches the local, regional
//! and national demographic features for it, and rewrites the JSON documents
//! of an embedded story in flight so the story shows local values.
//!
//! # High-Level API
//!
//! For most use cases, the [`pipeline`] module provides a simplified facade:
//!
//! ```ignore
//! use std::sync::Arc;
//! use localstory::config::ConfigFile;
//! use localstory::fetch::{FetchSlot, ReqwestFetch};
//! use localstory::pipeline::StoryPipeline;
//!
//! let real = Arc::new(ReqwestFetch::new()?);
//! let slot = Arc::new(FetchSlot::new(real.clone()));
//! let pipeline = StoryPipeline::from_config(&ConfigFile::load()?, real);
//! let outcome = pipeline.run(&page_url, slot).await?;
//! ```

pub mod aggregate;
pub mod config;
pub mod fetch;
pub mod geo;
pub mod location;
pub mod logging;
pub mod pipeline;
pub mod rules;
pub mod search;

/// Version of the LocalStory library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
