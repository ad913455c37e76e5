use crate::wol::{MagicPacket, PacketSender, SendError};
use log::info;
use std::net::SocketAddrV4;

/// Logs what would have been sent instead of touching the network.
/// Useful when developing on a machine that is not on the target LAN.
pub struct LogOnlySender;

impl PacketSender for LogOnlySender {
    fn send(&self, packet: &MagicPacket, destination: SocketAddrV4) -> Result<(), SendError> {
        info!("faking wake of {} via {}", packet.target(), destination);
        Ok(())
    }
}
