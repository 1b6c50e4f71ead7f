//! Tunnel adapter: connection lifecycle, service loop, and frame plumbing.
//!
//! [`TunnelAdapter`] makes a remote reliable-UDP peer look like a physical
//! broadband network adapter. The caller thread owns activation, teardown
//! and the transmit path; a dedicated service thread polls the transport
//! and dispatches its events. The only cross-thread state is three
//! independent atomic flags, so no locking protects the transport handles;
//! the transport is required to tolerate one thread sending while another
//! polls (see [`Transport`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::config::TunnelConfig;
use crate::error::{Error, Result};
use crate::protocol::{self, Channel, ControlMessage};
use crate::sink::FrameSink;
use crate::transport::{Event, Transport, TransportHost, TransportPeer};

/// Bounded wait for one service-loop poll.
///
/// Also bounds shutdown latency: the stop flag is observed at most one tick
/// after being raised.
pub const SERVICE_TICK: Duration = Duration::from_millis(200);

type PeerOf<T> = <<T as Transport>::Host as TransportHost>::Peer;

/// Cross-thread signal flags shared with the service loop.
///
/// Three independent booleans; no invariant spans more than one flag, so
/// none of them needs a lock.
#[derive(Debug, Default)]
struct Flags {
    /// Receiver gate, toggled by recv_start/recv_stop.
    read_enabled: AtomicBool,
    /// Peer-connection-up indicator, written by the service loop.
    connected: AtomicBool,
    /// Shutdown request to the service loop.
    stop: AtomicBool,
}

/// One activation's transport handles plus its service thread.
///
/// After a resolve or connect-initiation failure the host is kept with no
/// peer and no thread: a retry-visible partial activation.
struct Session<T: Transport> {
    host: Arc<T::Host>,
    peer: Option<PeerOf<T>>,
    service_thread: Option<JoinHandle<()>>,
}

/// Virtual Ethernet adapter backed by a reliable-UDP tunnel.
///
/// Byte-transparent in both directions: outbound frames are forwarded
/// unmodified on the frame channel, inbound frames are copied verbatim into
/// the external [`FrameSink`].
pub struct TunnelAdapter<T: Transport> {
    transport: T,
    config: TunnelConfig,
    sink: Arc<dyn FrameSink>,
    flags: Arc<Flags>,
    session: Option<Session<T>>,
}

impl<T: Transport> TunnelAdapter<T> {
    /// Create an adapter for the given destination and frame sink.
    pub fn new(transport: T, config: TunnelConfig, sink: Arc<dyn FrameSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            sink,
            flags: Arc::new(Flags::default()),
            session: None,
        })
    }

    /// Open the tunnel session and start the service loop.
    ///
    /// Idempotent: returns `Ok` immediately when already activated. On a
    /// resolve or connect-initiation failure the created host is kept, so
    /// [`is_activated`](Self::is_activated) reports true for that partial,
    /// retryable state while the error tells the caller what went wrong.
    pub fn activate(&mut self) -> Result<()> {
        if self.is_activated() {
            debug!("activate called while already active");
            return Ok(());
        }

        let host = match self.transport.create_host(Channel::COUNT) {
            Ok(host) => Arc::new(host),
            Err(e) => {
                error!("couldn't open tunnel host, unable to initialize adapter: {e}");
                return Err(Error::HostCreation(e));
            }
        };

        let addr = match self.transport.resolve(&self.config.dest_host, self.config.dest_port) {
            Ok(addr) => addr,
            Err(e) => {
                error!(
                    host = %self.config.dest_host,
                    "couldn't resolve tunnel destination, unable to initialize adapter: {e}"
                );
                self.session = Some(Session { host, peer: None, service_thread: None });
                return Err(Error::Resolve { host: self.config.dest_host.clone(), source: e });
            }
        };

        let peer = match host.connect(&addr, Channel::COUNT) {
            Ok(peer) => peer,
            Err(e) => {
                error!("couldn't connect to tunnel server, unable to initialize adapter: {e}");
                self.session = Some(Session { host, peer: None, service_thread: None });
                return Err(Error::Connect(e));
            }
        };

        self.flags.stop.store(false, Ordering::SeqCst);
        self.flags.connected.store(false, Ordering::SeqCst);

        let service = ServiceContext::<T> {
            host: Arc::clone(&host),
            peer: peer.clone(),
            flags: Arc::clone(&self.flags),
            sink: Arc::clone(&self.sink),
            connect_msg: protocol::encode_connect_msg(&self.config.mac_address, &self.config.name),
        };
        let service_thread = thread::Builder::new()
            .name("ethertap-service".into())
            .spawn(move || service.run())?;

        info!(
            host = %self.config.dest_host,
            port = self.config.dest_port,
            "tunnel adapter activated"
        );
        self.session = Some(Session {
            host,
            peer: Some(peer),
            service_thread: Some(service_thread),
        });
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Stops the service loop and joins its thread before touching the
    /// transport handles, so no background work observes the teardown.
    /// The peer is aborted without a graceful handshake, pending outbound
    /// traffic is flushed, and the host is destroyed. Finally the receiver
    /// gate is cleared.
    pub fn deactivate(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Err(Error::NotActivated);
        };

        // Best-effort goodbye on the control channel; teardown below is
        // abortive either way.
        if self.flags.connected.load(Ordering::SeqCst) {
            if let Some(peer) = &session.peer {
                if let Err(e) = peer.send(
                    Channel::Control as u8,
                    &protocol::DISCONNECT_MSG,
                    Channel::Control.delivery(),
                ) {
                    debug!("disconnect message not sent: {e}");
                }
            }
        }

        self.flags.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = session.service_thread.take() {
            if handle.join().is_err() {
                warn!("service thread panicked during shutdown");
            }
        }

        if let Some(peer) = session.peer.take() {
            peer.disconnect_now();
            session.host.flush();
            peer.reset();
        }
        // The service thread has exited, so this drops the last host handle.
        drop(session);

        self.flags.connected.store(false, Ordering::SeqCst);
        self.flags.read_enabled.store(false, Ordering::SeqCst);
        info!("tunnel adapter deactivated");
        Ok(())
    }

    /// True iff a host handle exists. Does not imply the peer is connected.
    pub fn is_activated(&self) -> bool {
        self.session.is_some()
    }

    /// True while the transport reports the peer connection up.
    pub fn is_connected(&self) -> bool {
        self.flags.connected.load(Ordering::SeqCst)
    }

    /// Forward one Ethernet frame to the tunnel, unmodified.
    ///
    /// Not being connected is not an error: the frame is silently dropped
    /// and `Ok` returned, mirroring Ethernet's own best-effort contract.
    pub fn send_frame(&self, frame: &[u8]) -> Result<()> {
        if !self.is_connected() {
            trace!(len = frame.len(), "outbound frame dropped, tunnel not connected");
            return Ok(());
        }
        self.send(Channel::EthFrame, frame)
    }

    /// Open the receiver gate: inbound frames reach the sink from the next
    /// polled event on.
    pub fn recv_start(&self) {
        self.flags.read_enabled.store(true, Ordering::SeqCst);
    }

    /// Close the receiver gate, immediately effective for the next polled
    /// event. Independent of connection state.
    pub fn recv_stop(&self) {
        self.flags.read_enabled.store(false, Ordering::SeqCst);
    }

    /// Announce the adapter's MAC address and display name on the control
    /// channel.
    ///
    /// The service loop sends this automatically when the peer connection
    /// comes up; the method is public for embedders that re-announce.
    pub fn send_connect_msg(&self) -> Result<()> {
        let msg = protocol::encode_connect_msg(&self.config.mac_address, &self.config.name);
        self.send(Channel::Control, &msg)
    }

    /// Send the single-byte disconnect message on the control channel.
    pub fn send_disconnect_msg(&self) -> Result<()> {
        self.send(Channel::Control, &protocol::DISCONNECT_MSG)
    }

    /// Shared transmit primitive: channel number plus the channel's
    /// delivery class.
    fn send(&self, channel: Channel, data: &[u8]) -> Result<()> {
        let peer = self
            .session
            .as_ref()
            .and_then(|s| s.peer.as_ref())
            .ok_or(Error::NotActivated)?;
        peer.send(channel as u8, data, channel.delivery())?;
        Ok(())
    }
}

/// State handed to the service thread.
struct ServiceContext<T: Transport> {
    host: Arc<T::Host>,
    peer: PeerOf<T>,
    flags: Arc<Flags>,
    sink: Arc<dyn FrameSink>,
    connect_msg: [u8; protocol::CONNECT_MSG_SIZE],
}

impl<T: Transport> ServiceContext<T> {
    /// Poll the transport until asked to stop.
    ///
    /// The stop flag is checked once per iteration, after the polled event
    /// (if any) has been fully handled, so an in-flight event is always
    /// drained before shutdown.
    fn run(self) {
        debug!("service loop started");
        while !self.flags.stop.load(Ordering::SeqCst) {
            match self.host.service(SERVICE_TICK) {
                Ok(Some(event)) => self.dispatch(event),
                Ok(None) => {}
                Err(e) => warn!("transport poll failed: {e}"),
            }
        }
        debug!("service loop stopped");
    }

    fn dispatch(&self, event: Event) {
        match event {
            Event::Connected => {
                info!("tunnel peer connected");
                self.flags.connected.store(true, Ordering::SeqCst);
                if let Err(e) = self.peer.send(
                    Channel::Control as u8,
                    &self.connect_msg,
                    Channel::Control.delivery(),
                ) {
                    warn!("couldn't announce adapter to tunnel server: {e}");
                }
            }
            Event::Disconnected => {
                info!("tunnel peer disconnected");
                self.flags.connected.store(false, Ordering::SeqCst);
            }
            Event::Receive { channel, data } => {
                if channel == Channel::EthFrame as u8 {
                    self.handle_eth_frame(&data);
                } else {
                    self.handle_control(&data);
                }
                // `data` drops here, releasing the packet's backing memory
                // regardless of handler outcome.
            }
        }
    }

    fn handle_eth_frame(&self, frame: &[u8]) {
        if !self.flags.read_enabled.load(Ordering::SeqCst) {
            trace!(len = frame.len(), "inbound frame dropped, receiver stopped");
            return;
        }
        if frame.len() > self.sink.capacity() {
            // Dropped whole; truncating would corrupt the frame boundary.
            debug!(
                len = frame.len(),
                capacity = self.sink.capacity(),
                "inbound frame exceeds receive buffer, dropped"
            );
            return;
        }
        self.sink.write(frame);
        self.sink.notify();
    }

    fn handle_control(&self, data: &[u8]) {
        // Reactions beyond logging are a protocol extension point.
        match data.first().copied().and_then(ControlMessage::from_byte) {
            Some(ControlMessage::Connect) => debug!("control: peer connect announcement"),
            Some(ControlMessage::Disconnect) => debug!("control: peer disconnect announcement"),
            None => debug!(len = data.len(), "control: unknown message, ignored"),
        }
    }
}
