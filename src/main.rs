//! PSN Gateway - REST gateway over the PlayStation Network API

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use psn_gateway::{
    cli::{Cli, Command},
    config::Config,
    gateway::{ENDPOINTS, Gateway},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Routes) => print_routes(),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Print the endpoint table
fn print_routes() -> ExitCode {
    println!("GET   /");
    println!("GET   /health");
    for endpoint in ENDPOINTS {
        println!("POST  {:<40} {}", endpoint.path, endpoint.required.join(", "));
    }
    ExitCode::SUCCESS
}

/// Run the gateway server
async fn run_server(cli: Cli) -> ExitCode {
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host.clone_from(host);
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        endpoints = ENDPOINTS.len(),
        "Starting PSN Gateway"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
