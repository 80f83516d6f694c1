//! calmerge CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calmerge_client::{Cli, ClientResult, RunSummary};
use calmerge_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match start(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: Cli) -> ClientResult<RunSummary> {
    init_tracing(cli.tracing_config())?;
    calmerge_client::run(&cli).await
}
