//! Server configuration
//!
//! Every option can be given on the command line or through the
//! environment; the command line wins.

use std::net::SocketAddr;

use clap::Parser;

/// Runtime options of the quiz server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Address to bind to
    #[arg(short = 'H', long, env = "QUIZZER_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to listen on
    #[arg(short, long, env = "QUIZZER_PORT", default_value = "8000")]
    pub port: u16,
    /// Log filter used when RUST_LOG is not set, e.g. `info` or `quizzer=debug`
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// The socket address to listen on
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an IP address.
    pub fn address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        Ok(SocketAddr::new(self.host.parse()?, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}
