// src/session.rs
use crate::probe::{self, AttemptScope};
use crate::resolver::{parse_ip_literal, HostResolver};
use crate::types::{Edition, ExecuteConfig, ExecuteDetails, McQueryError, ServerStatus};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a query plus the diagnostics gathered on the way.
pub type Execution = (Result<ServerStatus, McQueryError>, ExecuteDetails);

/// Anything that can answer a query for one target.
#[async_trait]
pub trait ServerProbe: Send + Sync {
    async fn execute(&self, config: ExecuteConfig, cancel: &CancellationToken) -> Execution;
}

/// Executes queries using a shared resolver.
#[derive(Clone)]
pub struct Session {
    resolver: Arc<HostResolver>,
}

impl Session {
    pub fn new(resolver: Arc<HostResolver>) -> Self {
        Self { resolver }
    }

    /// Queries one server, retrying according to `config`.
    ///
    /// Runs `retry_count + 1` attempts, each bounded by `config.timeout`
    /// when non-zero. The details of every attempt are merged; on failure
    /// the last attempt's error is returned.
    pub async fn execute(&self, config: ExecuteConfig, cancel: &CancellationToken) -> Execution {
        let port = if config.port == 0 {
            config.edition.default_port()
        } else {
            config.port
        };
        let mut details = ExecuteDetails::requested(&config.host, port);

        let host = config.host.trim().to_string();
        if host.is_empty() {
            return (Err(McQueryError::ConfigError("host cannot be empty".to_string())), details);
        }

        let attempts = config.retry_count.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let scope = AttemptScope::new(config.timeout, cancel.clone(), &host, port);
            let (outcome, attempt_details) = self.execute_once(&config, &host, port, &scope).await;
            details.merge(attempt_details);
            details.attempts = attempt;

            match outcome {
                Ok(status) => return (Ok(status), details),
                Err(e) => {
                    debug!("{} {}:{} attempt {}/{} failed: {}", config.edition, host, port, attempt, attempts, e);
                    details.last_error = Some(e.to_string());
                    if matches!(e, McQueryError::Cancelled) {
                        return (Err(e), details);
                    }
                    last_error = Some(e);
                }
            }

            if attempt < attempts && !config.retry_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return (Err(McQueryError::Cancelled), details),
                    _ = tokio::time::sleep(config.retry_delay) => {}
                }
            }
        }

        (Err(last_error.unwrap_or(McQueryError::RequestFailed)), details)
    }

    async fn execute_once(&self, config: &ExecuteConfig, host: &str, port: u16, scope: &AttemptScope) -> Execution {
        match config.edition {
            Edition::Java => self.execute_java(config, host, port, scope).await,
            Edition::Bedrock => self.execute_bedrock(config, host, port, scope).await,
        }
    }

    async fn execute_java(&self, config: &ExecuteConfig, host: &str, port: u16, scope: &AttemptScope) -> Execution {
        let mut details = ExecuteDetails {
            dial_host: Some(host.to_string()),
            dial_port: Some(port),
            ..Default::default()
        };

        let mut dial_host = host.to_string();
        let mut dial_port = port;
        if config.enable_srv && parse_ip_literal(host).is_none() {
            match scope.run(self.resolver.resolve_srv(host)).await {
                Ok(target) => {
                    debug!("SRV redirects {} to {}:{}", host, target.host, target.port);
                    details.srv_used = true;
                    details.srv_host = Some(target.host.clone());
                    details.srv_port = Some(target.port);
                    dial_host = target.host;
                    dial_port = target.port;
                }
                Err(McQueryError::Cancelled) => return (Err(McQueryError::Cancelled), details),
                Err(e) => details.srv_error = Some(e.to_string()),
            }
        }

        let resolution = match scope.run(self.resolver.resolve_ip(&dial_host, config.ip_mode)).await {
            Ok(resolution) => resolution,
            Err(e) => return (Err(e), details),
        };
        details.dial_host = Some(dial_host);
        details.dial_port = Some(dial_port);
        details.selected_ip = Some(resolution.selected);
        details.resolved_ips = resolution.addresses;

        let outcome = probe::java::ping(scope, resolution.selected, host, dial_port)
            .await
            .map(ServerStatus::Java);
        (outcome, details)
    }

    async fn execute_bedrock(&self, config: &ExecuteConfig, host: &str, port: u16, scope: &AttemptScope) -> Execution {
        let mut details = ExecuteDetails {
            dial_host: Some(host.to_string()),
            dial_port: Some(port),
            ..Default::default()
        };

        let resolution = match scope.run(self.resolver.resolve_ip(host, config.ip_mode)).await {
            Ok(resolution) => resolution,
            Err(e) => return (Err(e), details),
        };
        details.selected_ip = Some(resolution.selected);
        details.resolved_ips = resolution.addresses;

        let outcome = probe::bedrock::ping(scope, resolution.selected, port)
            .await
            .map(ServerStatus::Bedrock);
        (outcome, details)
    }
}

#[async_trait]
impl ServerProbe for Session {
    async fn execute(&self, config: ExecuteConfig, cancel: &CancellationToken) -> Execution {
        Session::execute(self, config, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecuteOptions, IpMode, ResolverConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::{TcpListener, UdpSocket};

    fn session() -> Session {
        let config = ResolverConfig {
            use_system_resolver: false,
            ..Default::default()
        };
        Session::new(Arc::new(HostResolver::new(&config).unwrap()))
    }

    fn options(retry_count: u32, retry_delay: Duration) -> ExecuteOptions {
        ExecuteOptions {
            timeout: Duration::from_millis(500),
            retry_count,
            retry_delay,
            enable_srv: false,
            ip_mode: IpMode::Auto,
        }
    }

    #[tokio::test]
    async fn test_always_failing_target_is_tried_retry_count_plus_one_times() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let server = tokio::spawn(async move {
            loop {
                let (conn, _) = listener.accept().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
                drop(conn);
            }
        });

        let config = ExecuteConfig::new(Edition::Java, "127.0.0.1", port, &options(2, Duration::from_millis(10)));
        let (outcome, details) = session().execute(config, &CancellationToken::new()).await;
        server.abort();

        let err = outcome.unwrap_err();
        assert!(matches!(err, McQueryError::NetworkError(_)));
        assert_eq!(details.attempts, 3);
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        assert_eq!(details.last_error, Some(err.to_string()));
        assert_eq!(details.selected_ip, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(details.requested_port, port);
    }

    #[tokio::test]
    async fn test_bedrock_query_through_session() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            let advertise = b"MCPE;Hello;686;1.21.0;1;8";
            let mut pong = vec![0x1c];
            pong.extend_from_slice(&[0u8; 16]);
            pong.extend_from_slice(&crate::protocol::bedrock::MAGIC);
            pong.extend_from_slice(&(advertise.len() as u16).to_be_bytes());
            pong.extend_from_slice(advertise);
            server.send_to(&pong, peer).await.unwrap();
        });

        let config = ExecuteConfig::new(Edition::Bedrock, "127.0.0.1", port, &options(0, Duration::ZERO));
        let (outcome, details) = session().execute(config, &CancellationToken::new()).await;

        match outcome.unwrap() {
            ServerStatus::Bedrock(status) => assert_eq!(status.motd, "Hello"),
            other => panic!("unexpected status {:?}", other),
        }
        assert_eq!(details.attempts, 1);
        assert_eq!(details.last_error, None);
        assert_eq!(details.dial_port, Some(port));
    }

    #[tokio::test]
    async fn test_failed_srv_lookup_is_recorded_and_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (conn, _) = listener.accept().await.unwrap();
            drop(conn);
        });

        // Nothing listens on the discard port, so the SRV query fails while
        // `localhost` still resolves from the hosts file.
        let resolver = HostResolver::new(&ResolverConfig {
            use_system_resolver: false,
            nameservers: vec!["127.0.0.1:9".to_string()],
            timeout_secs: 1,
        })
        .unwrap();
        let session = Session::new(Arc::new(resolver));
        let config = ExecuteConfig::new(
            Edition::Java,
            "localhost",
            port,
            &ExecuteOptions {
                timeout: Duration::from_secs(10),
                enable_srv: true,
                ip_mode: IpMode::Ipv4,
                ..options(0, Duration::ZERO)
            },
        );
        let (outcome, details) = session.execute(config, &CancellationToken::new()).await;
        server.await.unwrap();

        assert!(matches!(outcome, Err(McQueryError::NetworkError(_))));
        assert!(!details.srv_used);
        assert!(details.srv_error.is_some());
        assert_eq!(details.selected_ip, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(details.dial_port, Some(port));
        assert_eq!(details.attempts, 1);
    }

    #[tokio::test]
    async fn test_empty_host_fails_before_any_attempt() {
        let config = ExecuteConfig::new(Edition::Java, "  ", 0, &options(3, Duration::ZERO));
        let (outcome, details) = session().execute(config, &CancellationToken::new()).await;
        assert!(matches!(outcome, Err(McQueryError::ConfigError(_))));
        assert_eq!(details.attempts, 0);
        assert_eq!(details.requested_port, 25565);
    }

    #[tokio::test]
    async fn test_family_mismatch_is_reported_per_attempt() {
        let config = ExecuteConfig::new(
            Edition::Bedrock,
            "127.0.0.1",
            19132,
            &ExecuteOptions {
                ip_mode: IpMode::Ipv6,
                ..options(1, Duration::ZERO)
            },
        );
        let (outcome, details) = session().execute(config, &CancellationToken::new()).await;
        assert!(matches!(outcome, Err(McQueryError::ResolutionError(_))));
        assert_eq!(details.attempts, 2);
        assert!(details.selected_ip.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_retry_delay() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let config = ExecuteConfig::new(
            Edition::Java,
            "127.0.0.1",
            19132,
            &ExecuteOptions {
                ip_mode: IpMode::Ipv6,
                ..options(5, Duration::from_secs(30))
            },
        );
        let started = std::time::Instant::now();
        let (outcome, details) = session().execute(config, &cancel).await;
        assert!(matches!(outcome, Err(McQueryError::Cancelled)));
        assert_eq!(details.attempts, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
