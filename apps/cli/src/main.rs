//! WebClip CLI: clip web pages into Markdown notes with YAML frontmatter.
//!
//! Runs the conversion HTTP service or performs one-shot conversions from
//! the command line.

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
