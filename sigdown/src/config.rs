//! Configuration loading and default template generation.
//!
//! # Configuration File Format
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! log_level = "info"
//!
//! [shutdown]
//! handle_panics = true
//! drain_grace_ms = 0
//! ```

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Demo server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    host: IpAddr,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    shutdown: ShutdownConfig,
}

/// `[shutdown]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Report panics as uncaught faults.
    pub handle_panics: bool,
    /// Extra time the cleanup hook waits after the server drained.
    pub drain_grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            handle_panics: true,
            drain_grace_ms: 0,
        }
    }
}

fn default_host() -> IpAddr {
    env::var("HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn default_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

impl Config {
    /// Replaces the host and port with any value given on the command line.
    #[must_use]
    pub fn with_overrides(mut self, host: Option<IpAddr>, port: Option<u16>) -> Self {
        self.host = host.unwrap_or(self.host);
        self.port = port.unwrap_or(self.port);
        self
    }

    /// Address the server binds to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    /// Shutdown behaviour.
    #[must_use]
    pub const fn shutdown(&self) -> &ShutdownConfig {
        &self.shutdown
    }
}

impl ShutdownConfig {
    /// [`Self::drain_grace_ms`] as a [`Duration`].
    #[must_use]
    pub const fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

/// Parse configuration from TOML text.
///
/// # Errors
///
/// Returns the TOML deserialisation error.
pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// Load configuration from a TOML file at the given path.
///
/// Values not present in the file fall back to environment variables
/// (`PORT`, `HOST`) and then to hardcoded defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be resolved, read, or parsed.
pub fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config_path = path
        .canonicalize()
        .map_err(|e| format!("Failed to resolve config path '{}': {e}", path.display()))?;
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        format!(
            "Failed to read config file '{}': {e}",
            config_path.display()
        )
    })?;
    let config = parse_config(&content).map_err(|e| {
        format!(
            "Failed to parse TOML config '{}': {e}",
            config_path.display()
        )
    })?;
    Ok(config)
}

/// Generate a default TOML configuration template.
#[must_use]
pub const fn generate_default_config() -> &'static str {
    r#"# sigdown demo server configuration

# Server bind address and port.
# Can also be set via HOST / PORT environment variables.
host = "0.0.0.0"
port = 8080

# Log filter used when RUST_LOG is not set.
log_level = "info"

[shutdown]
# Report panics as uncaught faults (exit code 1 after cleanup).
handle_panics = true

# Extra time, in milliseconds, the cleanup hook waits after in-flight
# requests have drained.
drain_grace_ms = 0
"#
}
