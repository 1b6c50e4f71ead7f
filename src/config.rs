//! Configuration for the tunnel adapter.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::MacAddress;

/// Destination endpoint and adapter identity for one tunnel session.
///
/// Supplied by the embedder, immutable for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Destination hostname or IP address.
    pub dest_host: String,

    /// Destination port.
    #[serde(default = "default_port")]
    pub dest_port: u16,

    /// Hardware address announced in the connect message.
    pub mac_address: MacAddress,

    /// Display name announced in the connect message. Truncated to 16
    /// bytes on the wire.
    #[serde(default)]
    pub name: String,
}

fn default_port() -> u16 {
    crate::DEFAULT_PORT
}

impl TunnelConfig {
    /// Create a configuration for the given destination.
    pub fn new(dest_host: impl Into<String>, dest_port: u16, mac_address: MacAddress) -> Self {
        Self {
            dest_host: dest_host.into(),
            dest_port,
            mac_address,
            name: String::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.dest_host.is_empty() {
            return Err(Error::Config("destination host must not be empty".into()));
        }
        if self.dest_port == 0 {
            return Err(Error::Config("destination port must not be zero".into()));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&data).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, data)?;
        Ok(())
    }
}
