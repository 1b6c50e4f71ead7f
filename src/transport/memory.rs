//! In-process loopback transport over crossbeam channels.
//!
//! Backs tests and single-process embeddings without a real network. A
//! [`MemoryTransport`] is a registry of listening endpoints keyed by
//! host/port; [`MemoryListener`] stands in for the tunnel server and exposes
//! the peer side of each connection so tests can observe and inject traffic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::trace;

use super::{DeliveryMode, Event, Transport, TransportError, TransportHost, TransportPeer};

/// Resolved address on the in-process network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryAddr {
    host: String,
    port: u16,
}

type Registry = Mutex<HashMap<MemoryAddr, Sender<MemoryConn>>>;

/// In-process loopback transport.
///
/// Clones share one registry, so a listener registered on any clone is
/// reachable from hosts created on the others.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    registry: Arc<Registry>,
}

impl MemoryTransport {
    /// Create an empty loopback network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listening endpoint standing in for the tunnel server.
    pub fn listen(&self, host: &str, port: u16) -> MemoryListener {
        let (incoming_tx, incoming_rx) = unbounded();
        let addr = MemoryAddr { host: host.to_string(), port };
        self.registry.lock().insert(addr, incoming_tx);
        MemoryListener { incoming: incoming_rx }
    }
}

impl Transport for MemoryTransport {
    type Addr = MemoryAddr;
    type Host = MemoryHost;

    fn create_host(&self, channel_limit: usize) -> Result<MemoryHost, TransportError> {
        if channel_limit == 0 {
            return Err(TransportError::HostCreation(
                "channel limit must be non-zero".into(),
            ));
        }
        let (events_tx, events_rx) = unbounded();
        Ok(MemoryHost {
            registry: Arc::clone(&self.registry),
            events_tx,
            events_rx,
        })
    }

    fn resolve(&self, host: &str, port: u16) -> Result<MemoryAddr, TransportError> {
        // A hostname with embedded whitespace is how this network spells
        // "does not resolve"; empty hostnames never resolve anywhere.
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(TransportError::Resolve(format!("invalid hostname {host:?}")));
        }
        Ok(MemoryAddr { host: host.to_string(), port })
    }
}

/// Client-side host handle for the loopback network.
pub struct MemoryHost {
    registry: Arc<Registry>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
}

impl TransportHost for MemoryHost {
    type Addr = MemoryAddr;
    type Peer = MemoryPeer;

    fn connect(
        &self,
        addr: &MemoryAddr,
        channel_count: usize,
    ) -> Result<MemoryPeer, TransportError> {
        if channel_count == 0 {
            return Err(TransportError::Connect("channel count must be non-zero".into()));
        }
        let (to_server_tx, to_server_rx) = unbounded();
        let peer = MemoryPeer { tx: to_server_tx };

        // Asynchronous connect: an endpoint nobody listens on is not an
        // initiation failure, the Connected event just never arrives.
        if let Some(listener) = self.registry.lock().get(addr).cloned() {
            let conn = MemoryConn {
                events: to_server_rx,
                tx: self.events_tx.clone(),
            };
            if listener.send(conn).is_ok() {
                let _ = self.events_tx.send(Event::Connected);
                let _ = peer.tx.send(Event::Connected);
            }
        } else {
            trace!(?addr, "connect initiated to endpoint with no listener");
        }
        Ok(peer)
    }

    fn service(&self, timeout: Duration) -> Result<Option<Event>, TransportError> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn flush(&self) {
        // Channel sends complete immediately; nothing is ever queued.
    }
}

/// Client-side peer handle; cloned across the caller and service threads.
#[derive(Clone)]
pub struct MemoryPeer {
    tx: Sender<Event>,
}

impl TransportPeer for MemoryPeer {
    fn send(&self, channel: u8, data: &[u8], mode: DeliveryMode) -> Result<(), TransportError> {
        trace!(channel, len = data.len(), ?mode, "loopback send");
        self.tx
            .send(Event::Receive {
                channel,
                data: Bytes::copy_from_slice(data),
            })
            .map_err(|_| TransportError::Closed)
    }

    fn disconnect_now(&self) {
        // Abortive, but the other side still observes the drop.
        let _ = self.tx.send(Event::Disconnected);
    }

    fn reset(&self) {
        // Dropping the handle closes the channel; nothing else held.
    }
}

/// Server-side listener handle.
pub struct MemoryListener {
    incoming: Receiver<MemoryConn>,
}

impl MemoryListener {
    /// Wait for the next inbound connection.
    pub fn accept(&self, timeout: Duration) -> Option<MemoryConn> {
        self.incoming.recv_timeout(timeout).ok()
    }
}

/// Server-side view of one tunnel connection.
pub struct MemoryConn {
    events: Receiver<Event>,
    tx: Sender<Event>,
}

impl MemoryConn {
    /// Wait for the next event from the client.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Send a packet to the client on `channel`.
    pub fn send(&self, channel: u8, data: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(Event::Receive {
                channel,
                data: Bytes::copy_from_slice(data),
            })
            .map_err(|_| TransportError::Closed)
    }

    /// Signal a disconnect to the client.
    pub fn disconnect(&self) {
        let _ = self.tx.send(Event::Disconnected);
    }
}
