//! cs CLI - supervise a command and serve its health metrics

use clap::Parser;

use cs_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cs_cli::logging::init(cli.json, cli.no_color);
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
