//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, transport and
//! pipeline creation, and output files to reduce duplication across
//! command handlers.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use localstory::config::ConfigFile;
use localstory::fetch::{Fetch, FetchSlot, ReqwestFetch};
use localstory::location::SessionUrl;
use localstory::logging::{init_logging, LoggingGuard};
use localstory::pipeline::StoryPipeline;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    /// Real transport shared by all lookups
    fetch: Arc<dyn Fetch>,
}

impl CliRunner {
    /// Create a runner for a page URL argument, loading config and
    /// initializing logging.
    ///
    /// Without an argument the configured page is used. The page's `debug`
    /// flag enables debug-level logging regardless of the configured level.
    pub fn for_page(arg: Option<&str>) -> Result<(Self, SessionUrl), CliError> {
        let config = ConfigFile::load()?;
        let page = SessionUrl::parse(arg.unwrap_or(&config.story.page_url))?;
        let runner = Self::from_config(config, page.is_debug())?;
        Ok((runner, page))
    }

    fn from_config(config: ConfigFile, debug_mode: bool) -> Result<Self, CliError> {
        let logging = &config.logging;
        let logging_guard = init_logging(&logging.directory, &logging.file, &logging.level, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let fetch = ReqwestFetch::with_timeout(config.services.timeout).map_err(CliError::Transport)?;

        Ok(Self {
            logging_guard,
            config,
            fetch: Arc::new(fetch),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// The real, never intercepted, transport.
    pub fn fetch(&self) -> Arc<dyn Fetch> {
        Arc::clone(&self.fetch)
    }

    /// A fresh fetch slot over the real transport.
    pub fn slot(&self) -> Arc<FetchSlot> {
        Arc::new(FetchSlot::new(self.fetch()))
    }

    pub fn pipeline(&self) -> StoryPipeline {
        StoryPipeline::from_config(&self.config, self.fetch())
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("LocalStory v{}", localstory::VERSION);
        info!("LocalStory CLI: {} command", command);
    }

    /// Save a document to a file.
    pub fn save_document(&self, path: &Path, content: &str) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::FileWrite {
                path: parent.display().to_string(),
                error: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| CliError::FileWrite {
            path: path.display().to_string(),
            error: e,
        })?;

        info!(path = %path.display(), bytes = content.len(), "Document saved");
        Ok(())
    }
}
