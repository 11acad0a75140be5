//! Resolve command - run one resolving pass for a page.

use localstory::location::PageState;
use localstory::pipeline::PageOutcome;

use super::print_redirect;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the resolve command.
pub struct ResolveArgs {
    pub page_url: Option<String>,
}

/// Run the resolve command.
pub async fn run(args: ResolveArgs) -> Result<(), CliError> {
    let (runner, page) = CliRunner::for_page(args.page_url.as_deref())?;
    runner.log_startup("resolve");

    // A page that already carries a location needs no pass
    if let PageState::Rendering(query) = page.state() {
        println!("Location: {}", query);
        return Ok(());
    }

    match runner.pipeline().run(&page, runner.slot()).await? {
        PageOutcome::Redirect(redirect) => print_redirect(&redirect),
        PageOutcome::Rendered(session) => println!("Location: {}", session.query()),
    }
    Ok(())
}
