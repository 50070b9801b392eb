// src/probe/java.rs
use crate::error::Result;
use crate::probe::AttemptScope;
use crate::protocol::framing::{frame_len, VarIntDecoder};
use crate::protocol::java::{decode_pong, decode_status_response, handshake_frame, ping_frame, status_request_frame};
use crate::protocol::now_millis;
use crate::types::{JavaStatus, McQueryError};
use log::debug;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Runs the status handshake against `ip:port`, announcing `handshake_host`.
pub async fn ping(scope: &AttemptScope, ip: IpAddr, handshake_host: &str, port: u16) -> Result<JavaStatus> {
    let target = SocketAddr::new(ip, port);
    let mut stream = scope
        .run(async {
            TcpStream::connect(target)
                .await
                .map_err(|e| McQueryError::NetworkError(format!("Failed to connect to {}: {}", target, e)))
        })
        .await?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("could not set TCP_NODELAY for {}: {}", target, e);
    }

    scope.run(exchange(&mut stream, handshake_host, port)).await
}

async fn exchange<S>(stream: &mut S, handshake_host: &str, port: u16) -> Result<JavaStatus>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_frame(stream, &handshake_frame(handshake_host, port)).await?;
    write_frame(stream, &status_request_frame()).await?;

    let payload = read_frame(stream).await?;
    let mut status = decode_status_response(&payload)?;
    debug!("status for {}:{} decoded, measuring latency", handshake_host, port);

    write_frame(stream, &ping_frame(now_millis())).await?;
    let payload = read_frame(stream).await?;
    let echoed = decode_pong(&payload)?;
    status.latency_millis = latency_since(echoed)?;

    Ok(status)
}

/// Milliseconds elapsed since the echoed ping timestamp.
fn latency_since(echoed: i64) -> Result<i64> {
    let now = now_millis();
    if echoed < 0 || echoed > now {
        return Err(McQueryError::ProtocolError(format!("invalid pong timestamp: {}", echoed)));
    }
    Ok(now - echoed)
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer
        .write_all(frame)
        .await
        .map_err(|e| McQueryError::NetworkError(format!("Failed to send packet: {}", e)))
}

/// Reads one `[varint length][payload]` frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut decoder = VarIntDecoder::new();
    let length = loop {
        let byte = reader
            .read_u8()
            .await
            .map_err(|e| McQueryError::NetworkError(format!("Failed to read packet length: {}", e)))?;
        if let Some(value) = decoder.push(byte)? {
            break value;
        }
    };

    let mut payload = vec![0u8; frame_len(length)?];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| McQueryError::NetworkError(format!("Failed to read {} byte packet: {}", payload.len(), e)))?;
    Ok(payload)
}
