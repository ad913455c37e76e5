use crate::mac::{MacAddr, ParseMacError};
use crate::registry::Registry;
use crate::wol::{MagicPacket, PacketSender, SendError, WOL_PORT};
use log::{error, info, warn};
use std::net::{Ipv4Addr, SocketAddrV4};

#[derive(Clone, Copy, Debug)]
pub struct WakeConfig {
    /// Destination for devices with no per-entry broadcast address.
    pub default_broadcast: Ipv4Addr,
    pub port: u16,
}

impl Default for WakeConfig {
    fn default() -> WakeConfig {
        WakeConfig {
            default_broadcast: Ipv4Addr::BROADCAST,
            port: WOL_PORT,
        }
    }
}

/// What a successful wake actually promises: the packet was handed to
/// the network stack, aimed at this address. Wake-on-lan has no
/// acknowledgement, so nothing here says the machine came up.
#[derive(Clone, Debug)]
pub struct WakeReceipt {
    pub key: String,
    pub display_name: String,
    pub hardware_addr: MacAddr,
    pub destination: SocketAddrV4,
}

#[derive(thiserror::Error, Debug)]
pub enum WakeError {
    #[error("unknown device {key:?}")]
    UnknownDevice { key: String },
    #[error("device {key:?} has an unusable hardware address in the registry: {source}")]
    InvalidAddress {
        key: String,
        #[source]
        source: ParseMacError,
    },
    #[error("could not send wake packet for {key:?}: {source}")]
    Network {
        key: String,
        #[source]
        source: SendError,
    },
}

/// Looks up `key`, validates the stored hardware address, and hands one
/// magic packet to the sender. An unknown key returns before any
/// network work happens.
pub fn wake(
    registry: &Registry,
    sender: &dyn PacketSender,
    config: &WakeConfig,
    key: &str,
) -> Result<WakeReceipt, WakeError> {
    let entry = registry
        .lookup(key)
        .ok_or_else(|| WakeError::UnknownDevice {
            key: key.to_string(),
        })?;
    let hardware_addr: MacAddr = entry.hardware_addr.parse().map_err(|source| {
        warn!(
            "registry entry {:?} has hardware address {:?} which does not parse",
            entry.key, entry.hardware_addr
        );
        WakeError::InvalidAddress {
            key: entry.key.clone(),
            source,
        }
    })?;
    let destination = SocketAddrV4::new(
        entry.broadcast.unwrap_or(config.default_broadcast),
        config.port,
    );
    let packet = MagicPacket::new(&hardware_addr);
    match sender.send(&packet, destination) {
        Ok(()) => {
            info!(
                "magic packet for {} ({}) handed to {}",
                entry.key, hardware_addr, destination
            );
            Ok(WakeReceipt {
                key: entry.key.clone(),
                display_name: entry.display_name.clone(),
                hardware_addr,
                destination,
            })
        }
        Err(source) => {
            error!("wake of {} via {} failed: {}", entry.key, destination, source);
            Err(WakeError::Network {
                key: entry.key.clone(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::wake::*;
    use crate::wol::MAGIC_PACKET_LEN;
    use std::io;
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<(Vec<u8>, SocketAddrV4)>>,
    }

    impl RecordingSender {
        fn new() -> RecordingSender {
            RecordingSender {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl PacketSender for RecordingSender {
        fn send(&self, packet: &MagicPacket, destination: SocketAddrV4) -> Result<(), SendError> {
            self.sent
                .lock()
                .unwrap()
                .push((packet.as_bytes().to_vec(), destination));
            Ok(())
        }
    }

    struct FailingSender {}

    impl PacketSender for FailingSender {
        fn send(&self, _: &MagicPacket, destination: SocketAddrV4) -> Result<(), SendError> {
            Err(SendError::Send {
                destination,
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        }
    }

    fn sample_registry() -> Registry {
        Registry::parse(
            "desk,Desk Workstation,AA:BB:CC:DD:EE:01,192.168.1.255\n\
             rack,Rack Server,AA:BB:CC:DD:EE:02\n\
             broken,Broken Entry,ZZ:ZZ:ZZ:ZZ:ZZ:ZZ\n",
        )
        .unwrap()
    }

    #[test]
    fn wakes_through_the_configured_broadcast() {
        let registry = sample_registry();
        let sender = RecordingSender::new();
        let receipt = wake(&registry, &sender, &WakeConfig::default(), "desk").unwrap();

        assert_eq!(receipt.key, "desk");
        assert_eq!(receipt.display_name, "Desk Workstation");
        assert_eq!(receipt.destination, "192.168.1.255:9".parse().unwrap());

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (bytes, destination) = &sent[0];
        assert_eq!(*destination, receipt.destination);
        assert_eq!(bytes.len(), MAGIC_PACKET_LEN);
        assert_eq!(&bytes[..6], &[0xFF; 6]);
        assert_eq!(&bytes[6..12], &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
    }

    #[test]
    fn default_broadcast_applies_when_entry_has_none() {
        let registry = sample_registry();
        let sender = RecordingSender::new();
        let config = WakeConfig {
            default_broadcast: "10.0.0.255".parse().unwrap(),
            port: 7,
        };
        let receipt = wake(&registry, &sender, &config, "rack").unwrap();
        assert_eq!(receipt.destination, "10.0.0.255:7".parse().unwrap());
    }

    #[test]
    fn unknown_device_does_no_network_io() {
        let registry = sample_registry();
        let sender = RecordingSender::new();
        let err = wake(&registry, &sender, &WakeConfig::default(), "cellar").unwrap_err();
        assert!(matches!(err, WakeError::UnknownDevice { ref key } if key == "cellar"));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn broken_registry_entry_reports_invalid_address() {
        let registry = sample_registry();
        let sender = RecordingSender::new();
        let err = wake(&registry, &sender, &WakeConfig::default(), "broken").unwrap_err();
        assert!(matches!(err, WakeError::InvalidAddress { ref key, .. } if key == "broken"));
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn send_failure_reports_network_error() {
        let registry = sample_registry();
        let err = wake(&registry, &FailingSender {}, &WakeConfig::default(), "desk").unwrap_err();
        match err {
            WakeError::Network { key, source } => {
                assert_eq!(key, "desk");
                assert!(source.to_string().contains("255.255.255.255:9"));
            }
            other => panic!("expected Network error, got {:?}", other),
        }
    }
}
