//! Server command - start the game server
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: (delegated to zoondo-server crate)
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use zoondo_core::GameConfig;
use zoondo_server::{run_server, ServerConfig};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8003")]
    pub port: u16,

    /// Directory of static client files
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Card catalog JSON (bundled sample catalog if omitted)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Seconds a combat outcome stays on screen before play resumes
    #[arg(long, default_value = "5")]
    pub settle_delay: u64,

    /// Seconds shown on the turn clock
    #[arg(long, default_value = "30")]
    pub turn_timer: u32,

    /// Fixed rng seed for reproducible games
    #[arg(long)]
    pub seed: Option<u64>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run server command
///
/// This function reads like a table of contents:
/// 1. Configure server
/// 2. Start server (blocking)
pub fn run(args: ServerArgs) -> Result<()> {
    let config = configure_server(&args)?;

    tracing::info!("Starting Zoondo server on port {}", config.port);

    start_server(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs) -> Result<ServerConfig> {
    if let Some(dir) = &args.static_dir {
        validate_static_dir(dir)?;
    }
    if let Some(path) = &args.catalog {
        validate_catalog_path(path)?;
    }

    Ok(ServerConfig {
        port: args.port,
        static_dir: args
            .static_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().to_string()),
        catalog_path: args.catalog.clone(),
        settle_delay: Duration::from_secs(args.settle_delay),
        game: GameConfig {
            turn_timer: args.turn_timer,
            seed: args.seed,
        },
    })
}

/// Start the server (blocking)
fn start_server(config: ServerConfig) -> Result<()> {
    // Create tokio runtime for async server
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async { run_server(config).await })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!(
            "Static path exists but is not a directory: {}",
            path.display()
        );
    }

    Ok(())
}

fn validate_catalog_path(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Catalog file not found: {}", path.display());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
