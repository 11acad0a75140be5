//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for inspecting and
//! creating the configuration file.

use clap::Subcommand;
use localstory::config::{config_file_path, ConfigFile, InitOutcome};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path (honours LOCALSTORY_CONFIG)
    Path,

    /// Print the effective configuration as INI
    Show,

    /// Create the configuration file with default values
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Init { force } => run_init(force),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// Print the effective configuration.
fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// Create the configuration file.
fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();

    match ConfigFile::init_at(&path, force)? {
        InitOutcome::Created => println!("Created {}", path.display()),
        InitOutcome::Overwritten => println!("Reset {} to defaults", path.display()),
        InitOutcome::Kept => {
            println!("Configuration file already exists at {}", path.display());
            println!("Use 'localstory config init --force' to overwrite it with defaults.");
        }
    }
    Ok(())
}
