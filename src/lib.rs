//! ethertap - virtual Ethernet adapter tunneled over a reliable-UDP transport
//!
//! Makes a remote reliable-UDP peer look, to a hardware-emulation subsystem,
//! like a physical broadband network adapter. The crate owns the tunnel's
//! connection lifecycle, a background service loop polling the transport,
//! and the two-channel wire protocol (raw Ethernet frames plus a small
//! connect/disconnect control handshake). Frames pass through byte-exact in
//! both directions.
//!
//! ```text
//! emulated hardware ──send_frame──> TunnelAdapter ──frame channel──> transport
//! transport event ──service loop──> frame handler ──write+notify──> FrameSink
//! ```
//!
//! The transport itself (retransmission, ordering, congestion control) is a
//! collaborator behind the [`transport::Transport`] trait seam; an
//! in-process loopback implementation ships in [`transport::memory`].

pub mod adapter;
pub mod config;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;

pub use adapter::{TunnelAdapter, SERVICE_TICK};
pub use config::TunnelConfig;
pub use error::{Error, Result};
pub use sink::FrameSink;

/// Default destination port for tunnel servers.
pub const DEFAULT_PORT: u16 = 8245;
