//! Transport abstraction for the reliable-UDP tunnel.
//!
//! Models the primitives the adapter consumes: a client host that can
//! initiate one outgoing connection, numbered channels on that connection,
//! packets created with a reliability class, and a bounded-wait event poll.
//! Production implementations wrap a real reliable-UDP library; tests and
//! in-process embeddings use [`memory::MemoryTransport`].

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub mod memory;

pub use memory::{MemoryListener, MemoryTransport};

/// Errors reported by transport implementations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Creating the local host failed
    #[error("host creation failed: {0}")]
    HostCreation(String),

    /// Address resolution failed
    #[error("address resolution failed: {0}")]
    Resolve(String),

    /// Connect initiation failed
    #[error("connect initiation failed: {0}")]
    Connect(String),

    /// Send failed
    #[error("send failed: {0}")]
    Send(String),

    /// The endpoint is closed
    #[error("endpoint closed")]
    Closed,
}

/// Reliability class a packet is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Delivered reliably and in order within its channel.
    Reliable,
    /// Best-effort; the transport may drop or reorder it.
    Unsequenced,
}

/// Events produced by polling a transport host.
#[derive(Debug, Clone)]
pub enum Event {
    /// The peer connection is established.
    Connected,
    /// The peer connection is gone.
    Disconnected,
    /// A packet arrived on a channel.
    Receive {
        /// Channel the packet arrived on.
        channel: u8,
        /// Packet payload; dropping the value releases the backing memory.
        data: Bytes,
    },
}

/// Factory for transport hosts plus destination address resolution.
///
/// Implementations must tolerate one thread calling [`TransportPeer::send`]
/// while another polls [`TransportHost::service`] on the same connection;
/// the adapter relies on exactly that split and adds no locking of its own.
pub trait Transport: Send + Sync + 'static {
    /// Resolved destination address.
    type Addr: Send + Sync + Clone + fmt::Debug + 'static;

    /// Host handle produced by [`create_host`](Transport::create_host).
    type Host: TransportHost<Addr = Self::Addr>;

    /// Create a client host bound to no specific local address, supporting
    /// up to `channel_limit` channels per connection.
    fn create_host(&self, channel_limit: usize) -> Result<Self::Host, TransportError>;

    /// Resolve a destination host string and port.
    fn resolve(&self, host: &str, port: u16) -> Result<Self::Addr, TransportError>;
}

/// A transport host owning the local end of the tunnel.
pub trait TransportHost: Send + Sync + 'static {
    /// Resolved destination address, matching the parent transport.
    type Addr: Send + Sync + Clone + fmt::Debug + 'static;

    /// Peer handle produced by [`connect`](TransportHost::connect).
    type Peer: TransportPeer;

    /// Initiate an asynchronous connect to `addr` over `channel_count`
    /// channels.
    ///
    /// Success means initiation only: the connection is up once
    /// [`service`](TransportHost::service) yields [`Event::Connected`].
    /// There is no initiation timeout; a connect that never completes is
    /// observed as the event simply never arriving.
    fn connect(&self, addr: &Self::Addr, channel_count: usize)
        -> Result<Self::Peer, TransportError>;

    /// Poll for the next event, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when the wait expires with no event.
    fn service(&self, timeout: Duration) -> Result<Option<Event>, TransportError>;

    /// Flush pending outbound traffic.
    fn flush(&self);
}

/// A connection to the remote tunnel endpoint.
///
/// Handles are cheap to clone; the caller thread sends on one clone while
/// the service loop polls the host.
pub trait TransportPeer: Send + Sync + Clone + 'static {
    /// Send `data` on `channel` with the given delivery mode.
    fn send(&self, channel: u8, data: &[u8], mode: DeliveryMode) -> Result<(), TransportError>;

    /// Abort the connection without a graceful handshake.
    fn disconnect_now(&self);

    /// Return the peer to an unused state, dropping queued traffic.
    fn reset(&self);
}
