//! remotedocs CLI: pulls remote documentation into a static site tree.
//!
//! Fetches the configured sources, rewrites their markdown into the subset
//! the site renderer accepts, and writes everything under the content root.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
