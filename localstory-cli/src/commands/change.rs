//! Change command - verify a ZIP code and redirect a page to it.

use super::print_redirect;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the change command.
pub struct ChangeArgs {
    pub page_url: Option<String>,
    pub code: String,
}

/// Run the change command.
pub async fn run(args: ChangeArgs) -> Result<(), CliError> {
    let (runner, page) = CliRunner::for_page(args.page_url.as_deref())?;
    runner.log_startup("change");

    let redirect = runner.pipeline().change_location(&page, &args.code).await?;
    print_redirect(&redirect);
    Ok(())
}
