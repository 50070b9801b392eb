// src/protocol/java.rs
use crate::error::Result;
use crate::protocol::framing::{encode_frame, write_string, write_varint, PayloadReader};
use crate::protocol::strip_formatting;
use crate::types::{JavaStatus, McQueryError};
use serde::Deserialize;

/// Protocol number sent in the handshake (1.16.5). Servers answer status
/// requests regardless of the version a client announces.
pub const PROTOCOL_VERSION: i32 = 754;

pub const HANDSHAKE_ID: i32 = 0x00;
pub const STATUS_ID: i32 = 0x00;
pub const PING_ID: i32 = 0x01;

const NEXT_STATE_STATUS: i32 = 0x01;

pub fn handshake_frame(host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(host.len() + 16);
    write_varint(&mut payload, HANDSHAKE_ID);
    write_varint(&mut payload, PROTOCOL_VERSION);
    write_string(&mut payload, host);
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, NEXT_STATE_STATUS);
    encode_frame(&payload)
}

pub fn status_request_frame() -> Vec<u8> {
    let mut payload = Vec::with_capacity(1);
    write_varint(&mut payload, STATUS_ID);
    encode_frame(&payload)
}

pub fn ping_frame(timestamp_millis: i64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(9);
    write_varint(&mut payload, PING_ID);
    payload.extend_from_slice(&(timestamp_millis as u64).to_be_bytes());
    encode_frame(&payload)
}

/// Decodes a status response frame payload (packet id + JSON string).
pub fn decode_status_response(payload: &[u8]) -> Result<JavaStatus> {
    let mut reader = PayloadReader::new(payload);
    let packet_id = reader.read_varint()?;
    if packet_id != STATUS_ID {
        return Err(McQueryError::ProtocolError(format!(
            "unexpected status packet id: {} ({} byte payload)",
            packet_id,
            payload.len()
        )));
    }
    let json = reader.read_string()?;
    parse_status_json(&json)
}

/// Decodes a pong frame payload and returns the echoed timestamp.
pub fn decode_pong(payload: &[u8]) -> Result<i64> {
    let mut reader = PayloadReader::new(payload);
    let packet_id = reader.read_varint()?;
    if packet_id != PING_ID {
        return Err(McQueryError::ProtocolError(format!(
            "unexpected pong packet id: {} ({} byte payload)",
            packet_id,
            payload.len()
        )));
    }
    Ok(reader.read_u64()? as i64)
}

/// Server description: either a bare string or a chat component tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Plain(String),
    Component(TextComponent),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextComponent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub extra: Vec<Description>,
}

impl Description {
    /// Concatenates the component text depth first.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.append_to(&mut out);
        out
    }

    fn append_to(&self, out: &mut String) {
        match self {
            Description::Plain(text) => out.push_str(text),
            Description::Component(component) => {
                out.push_str(&component.text);
                for child in &component.extra {
                    child.append_to(out);
                }
            }
            Description::Other(_) => {}
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    version: RawVersion,
    #[serde(default)]
    players: RawPlayers,
    #[serde(default)]
    description: Option<Description>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVersion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    protocol: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlayers {
    #[serde(default)]
    max: i64,
    #[serde(default)]
    online: i64,
}

pub fn parse_status_json(json: &str) -> Result<JavaStatus> {
    let raw: RawStatus = serde_json::from_str(json).map_err(|e| {
        McQueryError::ProtocolError(format!("malformed status JSON ({} bytes): {}", json.len(), e))
    })?;

    let motd = raw.description.as_ref().map(Description::flatten).unwrap_or_default();
    Ok(JavaStatus {
        version_name: raw.version.name,
        protocol_version: raw.version.protocol,
        current_players: raw.players.online,
        max_players: raw.players.max,
        clean_motd: strip_formatting(&motd),
        motd,
        latency_millis: 0,
    })
}
