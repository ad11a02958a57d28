//! sigdown demo server
//!
//! A small HTTP service run under the [`sigdown::Coordinator`], showing how
//! signals, panics and bind failures end the process.
//!
//! ```sh
//! sigdown init            # Generate default config.toml
//! sigdown serve           # Start the server
//! sigdown serve -p 9000   # Start on another port
//! ```

mod cmd;
mod config;
mod routes;
mod telemetry;

use clap::Parser;
use cmd::{Cli, Commands};

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { output, force } => cmd::init::run(&output, force),
        Commands::Serve { config, host, port } => cmd::serve::run(&config, host, port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
