#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use clap::Parser;
use courier::{Cli, Courier};
use courier_common::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    logging::init();

    let report = Courier::new(config).with_seed(cli.seed).run().await?;
    let stats = report.stats;

    println!(
        "\n--- Run {}. Sent: {}, already sent: {}, failed: {}, send attempts: {} ---",
        report.end, stats.confirmed, stats.skipped, stats.failed, stats.attempts
    );

    Ok(())
}
