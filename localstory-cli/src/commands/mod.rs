//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`change`] - Switch a page to a user-entered ZIP code
//! - [`config`] - Configuration management (path, show, init)
//! - [`render`] - Render a page and print the rewritten story documents
//! - [`resolve`] - Run the resolving pass for a page
//! - [`search`] - Interactive address search
//! - [`surprise`] - Switch a page to a random ZIP code

pub mod change;
pub mod config;
pub mod render;
pub mod resolve;
pub mod search;
pub mod surprise;

use localstory::location::Redirect;

/// Prints a redirect the way every command reports one.
pub(crate) fn print_redirect(redirect: &Redirect) {
    println!("Redirect: {}", redirect.url);
    if !redirect.delay.is_zero() {
        println!("  (delayed {}s in debug mode)", redirect.delay.as_secs());
    }
}
