// src/probe/bedrock.rs
use crate::error::Result;
use crate::probe::AttemptScope;
use crate::protocol::bedrock::{build_unconnected_ping, parse_unconnected_pong, PING_LEN};
use crate::protocol::now_millis;
use crate::types::{BedrockStatus, McQueryError};
use log::debug;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Pings are repeated on this cadence until a pong arrives.
pub const SEND_INTERVAL: Duration = Duration::from_millis(50);

const RECV_BUF_LEN: usize = 2048;

/// Sends unconnected pings to `ip:port` and decodes the first pong.
pub async fn ping(scope: &AttemptScope, ip: IpAddr, port: u16) -> Result<BedrockStatus> {
    let target = SocketAddr::new(ip, port);
    let bind_addr: SocketAddr = match ip {
        IpAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        IpAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| McQueryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;
    // Filters datagrams to the target peer; no packets are exchanged.
    socket
        .connect(target)
        .await
        .map_err(|e| McQueryError::NetworkError(format!("Failed to set UDP peer {}: {}", target, e)))?;
    let socket = Arc::new(socket);

    let packet = build_unconnected_ping(now_millis());
    let stop = scope.cancel_token().child_token();
    let _stop_on_drop = stop.clone().drop_guard();
    let sender = tokio::spawn(send_loop(Arc::clone(&socket), packet, stop.clone()));

    let mut buf = vec![0u8; RECV_BUF_LEN];
    let received = scope
        .run(async {
            socket
                .recv(&mut buf)
                .await
                .map_err(|e| McQueryError::NetworkError(format!("Failed to read pong from {}: {}", target, e)))
        })
        .await;

    stop.cancel();
    if let Err(e) = sender.await {
        debug!("ping sender for {} ended abnormally: {}", target, e);
    }

    let len = received?;
    debug!("{} answered with {} bytes", target, len);
    parse_unconnected_pong(&buf[..len])
}

async fn send_loop(socket: Arc<UdpSocket>, packet: [u8; PING_LEN], stop: CancellationToken) {
    // First tick fires immediately.
    let mut ticker = tokio::time::interval(SEND_INTERVAL);
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {
                if let Err(e) = socket.send(&packet).await {
                    debug!("ping send failed: {}", e);
                }
            }
        }
    }
}
