//! Receive-side sink owned by the hardware-emulation device.

/// Fixed-capacity receive buffer plus notification entry point.
///
/// The service loop is the sink's only producer: each delivered frame is
/// copied in with [`write`](FrameSink::write) and then announced with one
/// synchronous [`notify`](FrameSink::notify) call, from the service thread.
/// The adapter never reads the buffer back; the owning device must
/// synchronize its own reads against the notification callback.
pub trait FrameSink: Send + Sync + 'static {
    /// Capacity of the receive buffer in bytes.
    ///
    /// Frames longer than this are dropped whole before delivery;
    /// truncation would corrupt frame boundaries.
    fn capacity(&self) -> usize;

    /// Copy `frame` into the receive buffer and record its length.
    ///
    /// Called only with `frame.len() <= self.capacity()`.
    fn write(&self, frame: &[u8]);

    /// Notification entry point, invoked once per delivered frame.
    fn notify(&self);
}
