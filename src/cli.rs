use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aipet")]
#[command(about = "Virtual pet backend - todos, food photos and conversations feed a pet that decays over time")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server and the decay scheduler
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Show the pet state for an account
    Status {
        /// Email of the account to inspect
        email: String,
        /// Data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Apply one decay cycle to every stored pet
    Tick {
        /// Data directory
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
}
