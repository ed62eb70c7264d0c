//! Zoondo CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the game server
//! - check-catalog: Validate a card catalog file

mod catalog;
mod server;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "zoondo")]
#[command(about = "Zoondo game server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Serve(server::ServerArgs),
    /// Load a card catalog and report its problems
    CheckCatalog(catalog::CatalogArgs),
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args),
        Commands::CheckCatalog(args) => catalog::run(args),
    }
}
