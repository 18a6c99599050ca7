//! FABLE CLI - collect marine forecasts and find family boating windows.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "fable",
    version,
    about = "Go/No-Go windows for family day trips by boat"
)]
struct Cli {
    #[command(subcommand)]
    command: fable_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("fable {}", env!("CARGO_PKG_VERSION"));
    fable_cmd::run(cli.command).await
}
