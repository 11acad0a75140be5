//! LocalStory CLI - Command-line interface
//!
//! This binary drives the LocalStory library: it runs page loads against a
//! page URL, prints the rewritten story documents and exposes the location
//! change flows.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::change::ChangeArgs;
use commands::config::ConfigCommands;
use commands::render::RenderArgs;
use commands::resolve::ResolveArgs;
use commands::search::SearchArgs;

#[derive(Parser)]
#[command(name = "localstory")]
#[command(version = localstory::VERSION)]
#[command(about = "Localize an embedded census story to a ZIP code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the resolving pass for a page and print where it redirects
    Resolve {
        /// Page URL (default: story.page_url from config)
        page_url: Option<String>,
    },

    /// Render a page and print its rewritten story documents
    Render {
        /// Page URL (default: story.page_url from config)
        page_url: Option<String>,

        /// Document URL to load through the interceptor (repeatable; default: the story's documents)
        #[arg(long = "document")]
        documents: Vec<String>,

        /// Directory to write documents to instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Search for an address and switch the page to its ZIP code
    Search {
        /// Page URL (default: story.page_url from config)
        page_url: Option<String>,
    },

    /// Switch the page to a ZIP code after checking that it exists
    Change {
        /// ZIP code to switch to
        code: String,

        /// Page URL (default: story.page_url from config)
        page_url: Option<String>,
    },

    /// Switch the page to a random ZIP code
    Surprise {
        /// Page URL (default: story.page_url from config)
        page_url: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve { page_url } => commands::resolve::run(ResolveArgs { page_url }).await,
        Commands::Render {
            page_url,
            documents,
            output,
        } => {
            commands::render::run(RenderArgs {
                page_url,
                documents,
                output,
            })
            .await
        }
        Commands::Search { page_url } => commands::search::run(SearchArgs { page_url }).await,
        Commands::Change { code, page_url } => {
            commands::change::run(ChangeArgs { page_url, code }).await
        }
        Commands::Surprise { page_url } => commands::surprise::run(page_url),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
