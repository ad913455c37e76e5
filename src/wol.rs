use crate::mac::MacAddr;
use std::io;
use std::net::{SocketAddrV4, UdpSocket};
use std::time::Duration;

pub mod noop;

/// Conventional discard-protocol port that wake-on-lan datagrams are
/// broadcast to. Nothing listens on it; the NIC snoops the wire.
pub const WOL_PORT: u16 = 9;

pub const MAGIC_PACKET_LEN: usize = 102;

const SYNCHRONIZATION_STREAM: [u8; 6] = [0xFF; 6];

/// Wire payload of a wake-on-lan frame: six 0xFF bytes followed by the
/// target hardware address repeated sixteen times.
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(addr: &MacAddr) -> MagicPacket {
        let mut data = [0u8; MAGIC_PACKET_LEN];
        data[..6].copy_from_slice(&SYNCHRONIZATION_STREAM);
        for repetition in data[6..].chunks_exact_mut(6) {
            repetition.copy_from_slice(addr.as_bytes());
        }
        MagicPacket(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The hardware address this packet wakes, read back out of the
    /// first repetition.
    pub fn target(&self) -> MacAddr {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(&self.0[6..12]);
        MacAddr::new(octets)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SendError {
    #[error("could not open a socket: {0}")]
    Bind(#[source] io::Error),
    #[error("could not configure the socket: {0}")]
    Configure(#[source] io::Error),
    #[error("could not send to {destination}: {source}")]
    Send {
        destination: SocketAddrV4,
        #[source]
        source: io::Error,
    },
    #[error("sent {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },
}

pub trait PacketSender: Sync + Send {
    fn send(&self, packet: &MagicPacket, destination: SocketAddrV4) -> Result<(), SendError>;
}

/// Sends each packet through a fresh broadcast-enabled UDP socket. The
/// socket only lives for the one send, so nothing is held open between
/// requests.
pub struct UdpSender {
    write_timeout: Duration,
}

impl UdpSender {
    pub fn new(write_timeout: Duration) -> UdpSender {
        UdpSender { write_timeout }
    }
}

impl PacketSender for UdpSender {
    fn send(&self, packet: &MagicPacket, destination: SocketAddrV4) -> Result<(), SendError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(SendError::Bind)?;
        socket.set_broadcast(true).map_err(SendError::Configure)?;
        socket
            .set_write_timeout(Some(self.write_timeout))
            .map_err(SendError::Configure)?;
        let sent = socket
            .send_to(packet.as_bytes(), destination)
            .map_err(|source| SendError::Send {
                destination,
                source,
            })?;
        if sent != MAGIC_PACKET_LEN {
            return Err(SendError::ShortSend {
                sent,
                expected: MAGIC_PACKET_LEN,
            });
        }
        Ok(())
    }
}
