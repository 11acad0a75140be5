//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use localstory::config::ConfigFileError;
use localstory::fetch::FetchError;
use localstory::location::SessionUrlError;
use localstory::pipeline::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// The page URL argument is malformed
    PageUrl(SessionUrlError),
    /// Failed to create the HTTP transport
    Transport(FetchError),
    /// A story session failed
    Pipeline(PipelineError),
    /// Failed to read standard input
    Input(std::io::Error),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Pipeline(e @ PipelineError::Aggregation { .. })
            | CliError::Pipeline(e @ PipelineError::UnknownLocation(_)) => {
                eprintln!();
                eprintln!("{}", e.user_message());
                eprintln!("Try another ZIP code with: localstory change <zip> [page-url]");
            }
            CliError::Pipeline(e @ PipelineError::Lookup(_))
            | CliError::Pipeline(e @ PipelineError::Fetch(_)) => {
                eprintln!();
                eprintln!("{}", e.user_message());
                eprintln!("Check your network connection and the service URLs in:");
                eprintln!("  {}", localstory::config::config_file_path().display());
            }
            CliError::Pipeline(e) => {
                eprintln!();
                eprintln!("{}", e.user_message());
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Fix the value above, or reset the file with: localstory config init --force");
            }
            CliError::PageUrl(_) => {
                eprintln!();
                eprintln!("Page URLs must be absolute, e.g. http://localhost:5173/?location=92373");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::PageUrl(e) => write!(f, "{}", e),
            CliError::Transport(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::Input(e) => write!(f, "Failed to read input: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::PageUrl(e) => Some(e),
            CliError::Transport(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            CliError::Input(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<SessionUrlError> for CliError {
    fn from(e: SessionUrlError) -> Self {
        CliError::PageUrl(e)
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}
