//! Engine configuration, read from a TOML file.
//!
//! The file mirrors the classic four-section layout: `[book]` for the
//! instrument and simulator seeding, `[order-entry]` and `[market-data]`
//! for the two gateway endpoints, and `[display]` for console output.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path}")]
    Io {
        /// Path that was attempted
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or misses required keys
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path that was attempted
        path: String,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Instrument and simulator settings
    pub book: BookConfig,
    /// Order-entry gateway endpoint
    pub order_entry: EndpointConfig,
    /// Market-data gateway endpoint
    pub market_data: EndpointConfig,
    /// Console display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// The `[book]` section: instrument identity and simulator seeding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BookConfig {
    /// Symbol the engine trades
    #[serde(default = "default_instrument")]
    pub instrument: String,
    /// Whether to seed the book and run the stochastic generators
    pub simulate: bool,
    /// Best bid to seed, in ticks
    pub initial_best_bid: u64,
    /// Best ask to seed, in ticks
    pub initial_best_ask: u64,
    /// Number of price levels to seed on each side
    #[serde(rename = "initial-levels")]
    pub initial_book_levels: u64,
    /// Orders per seeded level
    pub initial_orders: u64,
    /// Quantity of each seeded order
    pub initial_order_volume: u64,
    /// Minimum price increment, in ticks
    #[serde(default = "default_tick_size")]
    pub tick_size: u64,
}

/// A gateway listen endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// Interface address to bind
    pub request_address: String,
    /// TCP port to bind
    pub request_port: u16,
}

impl EndpointConfig {
    /// The `address:port` string accepted by `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.request_address, self.request_port)
    }
}

/// The `[display]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// What the dispatcher prints while draining events
    #[serde(default)]
    pub style: DisplayStyle,
}

/// Console output style for the market-data dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayStyle {
    /// Re-render the book after every drained event
    Book,
    /// Print each drained event
    Messages,
    /// No console output
    #[default]
    None,
}

fn default_instrument() -> String {
    "SIM".to_string()
}

fn default_tick_size() -> u64 {
    1
}

impl EngineConfig {
    /// Loads and parses the configuration file at `path`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
