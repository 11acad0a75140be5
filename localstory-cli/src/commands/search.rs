//! Search command - interactive address search.
//!
//! Each stdin line is the new contents of the search box. Published results
//! are printed as numbered candidates; `#n` picks candidate `n` and an empty
//! line (or end of input) cancels.

use std::sync::Arc;

use localstory::search::{Candidate, DebouncedSearch, GeocodeClient, SearchConfig, SearchOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::debug;

use super::print_redirect;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the search command.
pub struct SearchArgs {
    pub page_url: Option<String>,
}

/// One line of user input.
#[derive(Debug, PartialEq)]
enum SearchInput {
    Text(String),
    Select(usize),
    Cancel,
}

fn parse_input(line: &str) -> SearchInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SearchInput::Cancel;
    }
    match trimmed.strip_prefix('#').map(|n| n.trim().parse::<usize>()) {
        Some(Ok(n)) if n > 0 => SearchInput::Select(n),
        _ => SearchInput::Text(line.to_string()),
    }
}

/// Run the search command.
pub async fn run(args: SearchArgs) -> Result<(), CliError> {
    let (runner, page) = CliRunner::for_page(args.page_url.as_deref())?;
    runner.log_startup("search");

    let settings = &runner.config().search;
    let source = Arc::new(GeocodeClient::from_settings(runner.fetch(), settings));

    let (done_tx, done_rx) = oneshot::channel();
    let search = DebouncedSearch::new(source, SearchConfig::from_settings(settings), move |outcome| {
        let _ = done_tx.send(outcome);
    });

    let mut results = search.subscribe();
    let printer = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let candidates = results.borrow_and_update().clone();
            print_candidates(&candidates);
        }
    });

    println!("Type an address (#n selects, empty line cancels):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !search.is_closed() {
        let Some(line) = lines.next_line().await.map_err(CliError::Input)? else {
            search.cancel();
            break;
        };

        match parse_input(&line) {
            SearchInput::Text(text) => search.input(text),
            SearchInput::Cancel => search.cancel(),
            SearchInput::Select(n) => match search.results().get(n - 1) {
                Some(candidate) => search.select(candidate.clone()),
                None => println!("No candidate #{}", n),
            },
        }
    }

    printer.abort();
    drop(search);

    match done_rx.await {
        Ok(SearchOutcome::Selected(candidate)) => {
            println!("Selected: {}", candidate.address);
            let redirect = runner.pipeline().select_candidate(&page, &candidate).await?;
            print_redirect(&redirect);
        }
        Ok(SearchOutcome::Cancelled) | Err(_) => {
            debug!("Search session ended without a selection");
            println!("Search cancelled");
        }
    }
    Ok(())
}

fn print_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("(no results)");
        return;
    }
    for (i, candidate) in candidates.iter().enumerate() {
        println!("  #{} {}", i + 1, candidate.address);
    }
}
