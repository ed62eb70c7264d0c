//! Example to run the Zoondo server standalone
//!
//! Run with: cargo run -p zoondo-server --example run_server

use zoondo_server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ServerConfig::default();

    println!("Starting Zoondo server on port {}", config.port);
    println!("Connect to ws://localhost:{}/ws", config.port);

    run_server(config).await
}
