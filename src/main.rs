//! trellis-forge CLI entry point.
//!
//! Parses the command line, runs the selected command, and turns any
//! failure into a user-friendly message with a suggestion before exiting
//! non-zero.

use anyhow::Result;
use clap::Parser;
use trellis_forge::cli;
use trellis_forge::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let ctx = user_friendly_error(e);
            ctx.display();
            std::process::exit(1);
        }
    }
}
