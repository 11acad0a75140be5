//! Render command - run a page load and print the rewritten documents.
//!
//! A page without a location is resolved first and the redirect is followed
//! once, the way a browser would reload it.

use std::path::PathBuf;

use localstory::location::SessionUrl;
use localstory::pipeline::{PageOutcome, PipelineError, RenderedSession};
use serde_json::Value;
use tracing::{info, warn};

use super::print_redirect;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the render command.
pub struct RenderArgs {
    pub page_url: Option<String>,
    /// Documents to load instead of the story's default three
    pub documents: Vec<String>,
    /// Directory to write documents to instead of stdout
    pub output: Option<PathBuf>,
}

/// Run the render command.
pub async fn run(args: RenderArgs) -> Result<(), CliError> {
    let (runner, page) = CliRunner::for_page(args.page_url.as_deref())?;
    runner.log_startup("render");

    let pipeline = runner.pipeline();
    let session = match pipeline.run(&page, runner.slot()).await? {
        PageOutcome::Rendered(session) => session,
        PageOutcome::Redirect(redirect) => {
            print_redirect(&redirect);
            tokio::time::sleep(redirect.delay).await;

            let page = SessionUrl::parse(&redirect.url)?;
            match pipeline.run(&page, runner.slot()).await? {
                PageOutcome::Rendered(session) => session,
                PageOutcome::Redirect(again) => {
                    return Err(CliError::Config(format!(
                        "Page did not settle on a location (redirected again to {})",
                        again.url
                    )));
                }
            }
        }
    };

    println!("Location: {}", session.query());
    if session.scroll() {
        println!("  (scroll to location picker)");
    }

    let documents = load_documents(&session, &args.documents).await?;
    for (index, (url, document)) in documents.iter().enumerate() {
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| CliError::Pipeline(PipelineError::Document {
                url: url.clone(),
                reason: e.to_string(),
            }))?;

        match &args.output {
            Some(dir) => {
                let path = dir.join(document_file_name(index, url));
                runner.save_document(&path, &text)?;
                println!("Wrote {}", path.display());
            }
            None => {
                println!();
                println!("# {}", url);
                println!("{}", text);
            }
        }
    }

    session.finish();
    info!(documents = documents.len(), "Render complete");
    Ok(())
}

async fn load_documents(
    session: &RenderedSession,
    urls: &[String],
) -> Result<Vec<(String, Value)>, CliError> {
    if urls.is_empty() {
        return Ok(session.load_story_documents().await?);
    }

    let mut documents = Vec::with_capacity(urls.len());
    for url in urls {
        match session.load(url).await {
            Ok(document) => documents.push((url.clone(), document)),
            Err(e) => {
                warn!(url = %url, error = %e, "Document failed to load");
                return Err(e.into());
            }
        }
    }
    Ok(documents)
}

/// File name for the `index`th document, e.g. `00-4961e406.json`.
fn document_file_name(index: usize, url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix("/data").unwrap_or(path);
    let name: String = path
        .rsplit('/')
        .next()
        .unwrap_or("document")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        format!("{:02}-document.json", index)
    } else {
        format!("{:02}-{}.json", index, name)
    }
}
