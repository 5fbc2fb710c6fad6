use crate::error::{RemoteError, Result};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use tokio::net::UdpSocket;

/// Discard-protocol port the TV listens on while in standby
pub const WAKE_PORT: u16 = 7;

/// Length of a magic packet: 6 sync bytes + 16 copies of the MAC
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Parse a MAC address, tolerating `:`, `-`, `.` and whitespace delimiters
pub fn parse_mac(mac: &str) -> Result<[u8; 6]> {
    let digits: String = mac
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.') && !c.is_whitespace())
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RemoteError::InvalidMacAddress(mac.to_string()));
    }

    let mut bytes = [0u8; 6];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| RemoteError::InvalidMacAddress(mac.to_string()))?;
    }
    Ok(bytes)
}

/// Build the magic packet for `mac`
pub fn magic_packet(mac: &str) -> Result<[u8; MAGIC_PACKET_LEN]> {
    let mac = parse_mac(mac)?;

    let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac);
    }
    Ok(packet)
}

/// Broadcast a magic packet for `mac` on the local network
pub async fn wake(mac: &str) -> Result<()> {
    let target = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, WAKE_PORT));
    send_magic_packet(mac, target).await
}

/// Send one magic packet for `mac` to `target`
///
/// The socket only lives for this call.
pub async fn send_magic_packet(mac: &str, target: SocketAddr) -> Result<()> {
    let packet = magic_packet(mac)?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_broadcast(true)?;
    socket.send_to(&packet, target).await?;

    tracing::info!("Sent wake packet for {} to {}", mac, target);
    Ok(())
}
