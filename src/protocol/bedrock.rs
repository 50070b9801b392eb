// src/protocol/bedrock.rs
use crate::error::Result;
use crate::protocol::strip_formatting;
use crate::types::{BedrockStatus, McQueryError};

pub const UNCONNECTED_PING: u8 = 0x01;
pub const UNCONNECTED_PONG: u8 = 0x1c;

/// Offline message magic shared by RakNet unconnected packets.
pub const MAGIC: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

pub const PING_LEN: usize = 1 + 8 + MAGIC.len() + 8;

/// Pong header: id, timestamp, server guid, magic, advertise length.
pub const PONG_HEADER_LEN: usize = 35;

pub fn build_unconnected_ping(timestamp_millis: i64) -> [u8; PING_LEN] {
    let mut buf = [0u8; PING_LEN];
    buf[0] = UNCONNECTED_PING;
    buf[1..9].copy_from_slice(&(timestamp_millis as u64).to_be_bytes());
    buf[9..25].copy_from_slice(&MAGIC);
    // client guid stays zero
    buf
}

pub fn parse_unconnected_pong(buf: &[u8]) -> Result<BedrockStatus> {
    if buf.len() < PONG_HEADER_LEN {
        return Err(McQueryError::ProtocolError(format!("pong too short: {} bytes", buf.len())));
    }
    if buf[0] != UNCONNECTED_PONG {
        return Err(McQueryError::ProtocolError(format!("unexpected packet id: 0x{:02x}", buf[0])));
    }

    let advertise_len = u16::from_be_bytes([buf[33], buf[34]]) as usize;
    if PONG_HEADER_LEN + advertise_len > buf.len() {
        return Err(McQueryError::ProtocolError(format!(
            "invalid advertise length: {} (buf={})",
            advertise_len,
            buf.len()
        )));
    }

    let advertise = String::from_utf8_lossy(&buf[PONG_HEADER_LEN..PONG_HEADER_LEN + advertise_len]);
    let fields: Vec<&str> = advertise.split(';').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or_default().to_string();

    let motd = field(1);
    Ok(BedrockStatus {
        game_id: field(0),
        clean_motd: strip_formatting(&motd),
        motd,
        protocol_version: field(2),
        game_version: field(3),
        current_players: field(4),
        max_players: field(5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pong(advertise: &str) -> Vec<u8> {
        let mut buf = vec![UNCONNECTED_PONG];
        buf.extend_from_slice(&42u64.to_be_bytes());
        buf.extend_from_slice(&7u64.to_be_bytes());
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&(advertise.len() as u16).to_be_bytes());
        buf.extend_from_slice(advertise.as_bytes());
        buf
    }

    #[test]
    fn test_ping_layout() {
        let packet = build_unconnected_ping(0x0102_0304_0506_0708);
        assert_eq!(packet.len(), 33);
        assert_eq!(packet[0], 0x01);
        assert_eq!(&packet[1..9], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&packet[9..25], &MAGIC);
        assert!(packet[25..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_parse_full_pong() {
        let buf = pong("MCPE;§aDedicated Server;618;1.20.62;3;10;1234;Bedrock level;Survival");
        let status = parse_unconnected_pong(&buf).unwrap();
        assert_eq!(status.game_id, "MCPE");
        assert_eq!(status.motd, "§aDedicated Server");
        assert_eq!(status.clean_motd, "Dedicated Server");
        assert_eq!(status.protocol_version, "618");
        assert_eq!(status.game_version, "1.20.62");
        assert_eq!(status.current_players, "3");
        assert_eq!(status.max_players, "10");
    }

    #[test]
    fn test_parse_short_advertise_fills_blanks() {
        let status = parse_unconnected_pong(&pong("MCPE;Hi")).unwrap();
        assert_eq!(status.game_id, "MCPE");
        assert_eq!(status.motd, "Hi");
        assert_eq!(status.protocol_version, "");
        assert_eq!(status.max_players, "");

        let empty = parse_unconnected_pong(&pong("")).unwrap();
        assert_eq!(empty.game_id, "");
    }

    #[test]
    fn test_parse_rejects_bad_packets() {
        let err = parse_unconnected_pong(&[0x1c; 20]).unwrap_err();
        assert!(err.to_string().contains("pong too short: 20 bytes"));

        let mut wrong_id = pong("MCPE");
        wrong_id[0] = 0x1d;
        let err = parse_unconnected_pong(&wrong_id).unwrap_err();
        assert!(err.to_string().contains("0x1d"));

        let mut truncated = pong("MCPE;motd");
        truncated.truncate(truncated.len() - 2);
        let err = parse_unconnected_pong(&truncated).unwrap_err();
        assert!(err.to_string().contains("invalid advertise length: 9"));
    }
}
