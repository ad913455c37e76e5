use std::{
    env,
    net::{Ipv4Addr, SocketAddrV4},
    process,
    time::Duration,
};
use wakeboard::mac::MacAddr;
use wakeboard::wol::{MagicPacket, PacketSender, UdpSender, WOL_PORT};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("usage: wakecli <hardware address> [broadcast address]");
        process::exit(2);
    }

    let addr: MacAddr = args[1].parse()?;
    let broadcast: Ipv4Addr = match args.get(2) {
        Some(raw) => raw.parse()?,
        None => Ipv4Addr::BROADCAST,
    };

    let destination = SocketAddrV4::new(broadcast, WOL_PORT);
    let sender = UdpSender::new(Duration::from_secs(1));
    sender.send(&MagicPacket::new(&addr), destination)?;
    println!("magic packet for {} handed to {}", addr, destination);
    Ok(())
}
