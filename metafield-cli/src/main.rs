//! Metafield command-line tool.
//!
//! Usage:
//!   metafield --config metafield.toml token --schema book.json
//!   metafield save --schema book.json --owner 123 --request body.json
//!   metafield load --schema book.json --owner 123 --render

use anyhow::Result;
use clap::Parser;
use metafield_cli::{Args, load_config, run};
use metafield_request::logging;
use tracing::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let level = if args.verbose { "debug" } else { config.logging.level.as_str() };
    logging::init(level)?;
    if let Some(path) = &args.config {
        info!("Loaded configuration from {}", path.display());
    }
    debug!("Running {:?}", args.command);

    let stdout = std::io::stdout();
    run(&config, &args.command, &mut stdout.lock())
}
