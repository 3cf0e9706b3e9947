// ABOUTME: Configuration loading and validation for the pagewright server.
// ABOUTME: Reads PAGEWRIGHT_* environment variables with defaults and rejects unusable values.

use std::net::SocketAddr;
use std::path::PathBuf;

use pagewright_core::DEFAULT_HISTORY_CAPACITY;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PAGEWRIGHT_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("PAGEWRIGHT_HISTORY_CAP must be a positive integer, got: {0}")]
    InvalidHistoryCap(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PagewrightConfig {
    pub home: PathBuf,
    pub bind: SocketAddr,
    pub history_capacity: usize,
    pub public_base_url: String,
}

impl PagewrightConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - PAGEWRIGHT_HOME: data directory (default: ~/.pagewright)
    /// - PAGEWRIGHT_BIND: socket address to bind (default: 127.0.0.1:7340)
    /// - PAGEWRIGHT_HISTORY_CAP: undo/redo snapshots kept per editing session (default: 50)
    /// - PAGEWRIGHT_PUBLIC_BASE_URL: public URL for the server (default: http://<bind>)
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("PAGEWRIGHT_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".pagewright")
            });

        let bind_str =
            std::env::var("PAGEWRIGHT_BIND").unwrap_or_else(|_| "127.0.0.1:7340".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let history_capacity = match std::env::var("PAGEWRIGHT_HISTORY_CAP") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidHistoryCap(raw)),
            },
            Err(_) => DEFAULT_HISTORY_CAPACITY,
        };

        let public_base_url = std::env::var("PAGEWRIGHT_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}", bind));

        Ok(Self {
            home,
            bind,
            history_capacity,
            public_base_url,
        })
    }
}
