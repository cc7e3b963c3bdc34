//! Drowsiness Replay - Main Entry Point

use anyhow::Result;
use clap::Parser;
use replay::{init_logging, run, Args};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_json)?;

    info!("=== Drowsiness Replay v{} ===", env!("CARGO_PKG_VERSION"));
    run(args).await?;

    Ok(())
}
