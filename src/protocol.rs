//! Wire protocol for the tunnel: channel layout and control messages.
//!
//! Two channels are multiplexed on the peer connection. Channel 0 carries
//! raw Ethernet frames, forwarded byte-transparent; channel 1 carries the
//! small connect/disconnect control handshake. Frame contents are never
//! interpreted here.

use crate::transport::DeliveryMode;

/// Logical channels multiplexed on the peer connection.
///
/// Each channel carries independently ordered, independently reliable
/// traffic per the transport's channel semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    /// Raw Ethernet frame data.
    EthFrame = 0,
    /// Session control messages.
    Control = 1,
}

impl Channel {
    /// Number of channels opened on the peer connection.
    pub const COUNT: usize = 2;

    /// Delivery mode used for packets on this channel.
    ///
    /// Control messages must arrive reliably and in order. Frame data rides
    /// best-effort, matching Ethernet's own delivery model.
    pub fn delivery(self) -> DeliveryMode {
        match self {
            Channel::EthFrame => DeliveryMode::Unsequenced,
            Channel::Control => DeliveryMode::Reliable,
        }
    }
}

/// Control-channel message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlMessage {
    /// Adapter announcement: MAC address plus display name.
    Connect = 0,
    /// Session goodbye.
    Disconnect = 1,
}

impl ControlMessage {
    /// Decode the leading message-kind byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Connect),
            1 => Some(Self::Disconnect),
            _ => None,
        }
    }
}

/// Hardware (MAC) address of the emulated adapter.
pub type MacAddress = [u8; 6];

/// Maximum display-name bytes carried in a connect message.
pub const CONNECT_NAME_MAX: usize = 16;

/// Fixed size of the connect message: kind byte + MAC + length byte + name.
pub const CONNECT_MSG_SIZE: usize = 1 + 6 + 1 + CONNECT_NAME_MAX;

/// The single-byte disconnect control message.
pub const DISCONNECT_MSG: [u8; 1] = [ControlMessage::Disconnect as u8];

/// Build the connect control message.
///
/// Layout: kind byte, 6-byte MAC, one length byte, then the name bytes.
/// The name is silently truncated to [`CONNECT_NAME_MAX`] bytes and the
/// length byte records the truncated length; unused name bytes stay zero.
pub fn encode_connect_msg(mac: &MacAddress, name: &str) -> [u8; CONNECT_MSG_SIZE] {
    let mut buf = [0u8; CONNECT_MSG_SIZE];
    buf[0] = ControlMessage::Connect as u8;
    buf[1..7].copy_from_slice(mac);
    let name = name.as_bytes();
    let len = name.len().min(CONNECT_NAME_MAX);
    buf[7] = len as u8;
    buf[8..8 + len].copy_from_slice(&name[..len]);
    buf
}

/// Decoded connect message, the receiving side's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPayload {
    /// Announced hardware address.
    pub mac: MacAddress,
    /// Announced display name, at most [`CONNECT_NAME_MAX`] bytes.
    pub name: Vec<u8>,
}

/// Decode a connect control message built by [`encode_connect_msg`].
pub fn decode_connect_msg(buf: &[u8]) -> Option<ConnectPayload> {
    if buf.len() != CONNECT_MSG_SIZE || buf[0] != ControlMessage::Connect as u8 {
        return None;
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&buf[1..7]);
    let len = (buf[7] as usize).min(CONNECT_NAME_MAX);
    Some(ConnectPayload {
        mac,
        name: buf[8..8 + len].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];

    #[test]
    fn connect_msg_layout() {
        let msg = encode_connect_msg(&MAC, "bba");
        assert_eq!(msg.len(), CONNECT_MSG_SIZE);
        assert_eq!(msg[0], ControlMessage::Connect as u8);
        assert_eq!(&msg[1..7], &MAC);
        assert_eq!(msg[7], 3);
        assert_eq!(&msg[8..11], b"bba");
        assert!(msg[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn connect_msg_name_truncated_to_16() {
        let long = "a-name-well-beyond-sixteen-bytes";
        let msg = encode_connect_msg(&MAC, long);
        assert_eq!(msg[7], CONNECT_NAME_MAX as u8);
        assert_eq!(&msg[8..8 + CONNECT_NAME_MAX], &long.as_bytes()[..CONNECT_NAME_MAX]);
    }

    #[test]
    fn connect_msg_empty_name() {
        let msg = encode_connect_msg(&MAC, "");
        assert_eq!(msg[7], 0);
        assert!(msg[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn connect_msg_decodes_back() {
        let msg = encode_connect_msg(&MAC, "adapter-01");
        let payload = decode_connect_msg(&msg).unwrap();
        assert_eq!(payload.mac, MAC);
        assert_eq!(payload.name, b"adapter-01");
    }

    #[test]
    fn decode_rejects_wrong_kind_or_size() {
        let mut msg = encode_connect_msg(&MAC, "x");
        msg[0] = ControlMessage::Disconnect as u8;
        assert!(decode_connect_msg(&msg).is_none());
        assert!(decode_connect_msg(&msg[..10]).is_none());
        assert!(decode_connect_msg(&[]).is_none());
    }

    #[test]
    fn control_message_from_byte() {
        assert_eq!(ControlMessage::from_byte(0), Some(ControlMessage::Connect));
        assert_eq!(ControlMessage::from_byte(1), Some(ControlMessage::Disconnect));
        assert_eq!(ControlMessage::from_byte(2), None);
        assert_eq!(DISCONNECT_MSG, [1]);
    }

    #[test]
    fn channel_delivery_classes() {
        assert_eq!(Channel::Control.delivery(), DeliveryMode::Reliable);
        assert_eq!(Channel::EthFrame.delivery(), DeliveryMode::Unsequenced);
        assert_eq!(Channel::COUNT, 2);
        assert_eq!(Channel::EthFrame as u8, 0);
        assert_eq!(Channel::Control as u8, 1);
    }
}
