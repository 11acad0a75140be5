//! Surprise command - redirect a page to a random ZIP code.

use super::print_redirect;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the surprise command.
pub fn run(page_url: Option<String>) -> Result<(), CliError> {
    let (runner, page) = CliRunner::for_page(page_url.as_deref())?;
    runner.log_startup("surprise");

    print_redirect(&runner.pipeline().surprise_me(&page));
    Ok(())
}
