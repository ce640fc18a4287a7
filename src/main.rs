// main.rs
mod auth;
mod classifier;
mod cli;
mod config;
mod error;
mod gateway;
mod notifier;
mod pet;
mod routes;
mod scheduler;
mod sentiment;
mod status;
mod store;
mod todo;
mod user;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Args, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Serve { port, data_dir } => {
            let mut config = Config::new(data_dir)?;
            if let Some(port) = port {
                config.port = port;
            }
            routes::run_server(config).await
        }
        Commands::Status { email, data_dir } => status::handle_status(&email, data_dir).await,
        Commands::Tick { data_dir } => status::handle_tick(data_dir).await,
    }
}
