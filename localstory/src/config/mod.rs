//! Configuration for LocalStory.
//!
//! User settings live in `~/.localstory/config.ini` (or `$LOCALSTORY_CONFIG`):
//!
//! - [`settings`] - one struct per `[section]`
//! - [`defaults`] - `DEFAULT_*` constants and `ConfigFile::default()`
//! - parsing and writing of the INI format
//!
//! # Example
//!
//! ```ignore
//! use localstory::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! println!("story: {}", config.story.story_id);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError, InitOutcome, CONFIG_PATH_ENV};
pub use settings::{
    ConfigFile, FallbackMode, LocationSettings, LoggingSettings, SearchSettings, ServiceSettings,
    StorySettings,
};
