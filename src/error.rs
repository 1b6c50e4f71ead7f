//! Error types for the ethertap tunnel adapter.

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tunnel adapter operations.
///
/// Only activation-time failures and caller sequencing mistakes surface here.
/// Runtime conditions on the data path (send while unconnected, oversized
/// inbound frames) are silent drops by design, never errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening the local transport host failed
    #[error("Couldn't open tunnel host: {0}")]
    HostCreation(TransportError),

    /// The destination hostname/IP could not be resolved
    #[error("Couldn't resolve tunnel destination {host}: {source}")]
    Resolve {
        /// The hostname that failed to resolve
        host: String,
        /// Underlying transport error
        source: TransportError,
    },

    /// Initiating the connection to the tunnel server failed
    #[error("Couldn't connect to tunnel server: {0}")]
    Connect(TransportError),

    /// Operation requires a prior successful activation
    #[error("Tunnel adapter is not activated")]
    NotActivated,

    /// Transport-level failure on an established session
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
