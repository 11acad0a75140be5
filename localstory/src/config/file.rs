//! Locating, loading and writing `config.ini`.
//!
//! The file lives in `~/.localstory/config.ini` unless `LOCALSTORY_CONFIG`
//! names another path. Every error carries the path it happened on, so the
//! CLI can point the user at the file to fix.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::parser::{self, InvalidValue};
use super::settings::ConfigFile;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "LOCALSTORY_CONFIG";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create config directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration in {}: {section}.{key} = '{value}' - {reason}", path.display())]
    InvalidValue {
        path: PathBuf,
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFileError {
    /// The file the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Directory { path, .. }
            | Self::InvalidValue { path, .. } => path,
        }
    }
}

impl InvalidValue {
    fn at(self, path: &Path) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            path: path.to_path_buf(),
            section: self.section,
            key: self.key,
            value: self.value,
            reason: self.reason,
        }
    }
}

/// What [`ConfigFile::init_at`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Overwritten,
    /// The file existed and was left alone.
    Kept,
}

impl ConfigFile {
    /// Loads the user's configuration, or defaults when there is no file yet.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path`, overlaying its values on the defaults.
    ///
    /// A missing file yields the defaults; it is not created.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parser::parse_ini(&ini).map_err(|invalid| invalid.at(path))
    }

    /// Writes the commented INI form of this configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigFileError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, self.to_ini_string()).map_err(|source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The commented INI text that [`save_to`](Self::save_to) writes.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Writes a default configuration to `path`.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn init_at(path: &Path, force: bool) -> Result<InitOutcome, ConfigFileError> {
        let existed = path.exists();
        if existed && !force {
            return Ok(InitOutcome::Kept);
        }

        Self::default().save_to(path)?;
        Ok(if existed {
            InitOutcome::Overwritten
        } else {
            InitOutcome::Created
        })
    }
}

/// The default config directory (`~/.localstory`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".localstory")
}

/// The config file in use: `$LOCALSTORY_CONFIG`, else `~/.localstory/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_path_from(std::env::var_os(CONFIG_PATH_ENV))
}

fn config_path_from(env_override: Option<OsString>) -> PathBuf {
    env_override
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| config_directory().join("config.ini"))
}
