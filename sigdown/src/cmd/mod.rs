//! CLI definitions and command implementations for the demo server.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod init;
pub mod serve;

/// sigdown — HTTP server with coordinated graceful shutdown.
#[derive(Debug, Parser)]
#[command(name = "sigdown")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a default TOML configuration file.
    Init {
        /// Output path for the configuration file.
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite the file if it already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Start the HTTP server.
    Serve {
        /// Path to the TOML configuration file.
        #[arg(short, long, env = "CONFIG", default_value = "config.toml")]
        config: PathBuf,

        /// Bind address, taking precedence over the file and `HOST`.
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on, taking precedence over the file and `PORT`.
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_accepts_address_overrides() {
        let args = ["sigdown", "serve", "--port", "9000", "--host", "127.0.0.1"];
        let cli = Cli::try_parse_from(args).expect("arguments parse");
        assert!(matches!(
            cli.command,
            Commands::Serve { host: Some(host), port: Some(9000), .. }
                if host == IpAddr::from([127, 0, 0, 1])
        ));
    }

    #[test]
    fn serve_without_overrides_keeps_the_file_values() {
        let cli = Cli::try_parse_from(["sigdown", "serve"]).expect("arguments parse");
        assert!(matches!(
            cli.command,
            Commands::Serve { host: None, port: None, .. }
        ));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        assert!(Cli::try_parse_from(["sigdown", "serve", "--port", "70000"]).is_err());
    }
}
