// src/resolver.rs
use crate::types::{IpMode, McQueryError, ResolverConfig};
use log::debug;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use trust_dns_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig as DnsResolverConfig, ResolverOpts,
};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::TokioAsyncResolver;

/// Service label used for Java SRV redirection.
const JAVA_SRV_PREFIX: &str = "_minecraft._tcp";

/// Outcome of resolving a host to addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub selected: IpAddr,
    pub addresses: Vec<IpAddr>,
}

/// Dial target published in an SRV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

pub struct HostResolver {
    resolver: TokioAsyncResolver,
}

impl HostResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, McQueryError> {
        let resolver = if config.use_system_resolver {
            let (dns_config, mut opts) = trust_dns_resolver::system_conf::read_system_conf()
                .map_err(|e| McQueryError::ResolutionError(format!("Failed to read system resolver config: {}", e)))?;
            Self::tune(&mut opts, config);
            TokioAsyncResolver::tokio(dns_config, opts)
        } else {
            let mut dns_config = DnsResolverConfig::new();

            for ns in &config.nameservers {
                let socket_addr = SocketAddr::from_str(ns)
                    .map_err(|e| McQueryError::ConfigError(format!("Invalid nameserver address {}: {}", ns, e)))?;
                dns_config.add_name_server(NameServerConfig {
                    socket_addr,
                    protocol: Protocol::Udp,
                    tls_dns_name: None,
                    trust_negative_responses: false,
                    bind_addr: None,
                });
            }

            let mut opts = ResolverOpts::default();
            Self::tune(&mut opts, config);
            TokioAsyncResolver::tokio(dns_config, opts)
        };

        Ok(Self { resolver })
    }

    fn tune(opts: &mut ResolverOpts, config: &ResolverConfig) {
        opts.timeout = config.timeout();
        opts.attempts = 2;
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    }

    /// Resolves `host` to one address of the requested family.
    ///
    /// Literal addresses are used as-is but must match `mode`. In `Auto`
    /// mode IPv4 results win and IPv6 is only used when no IPv4 exists.
    pub async fn resolve_ip(&self, host: &str, mode: IpMode) -> Result<Resolution, McQueryError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(McQueryError::ConfigError("host cannot be empty".to_string()));
        }
        if let Some(ip) = parse_ip_literal(host) {
            if !mode.matches(&ip) {
                return Err(McQueryError::ResolutionError(format!(
                    "host {} does not match IP mode {}",
                    host, mode
                )));
            }
            return Ok(Resolution { selected: ip, addresses: vec![ip] });
        }

        let addresses = match self.resolver.lookup_ip(host).await {
            Ok(lookup) => lookup.iter().collect(),
            Err(e) if is_not_found(&e) => Vec::new(),
            Err(e) => {
                return Err(McQueryError::ResolutionError(format!("Failed to resolve {}: {}", host, e)));
            }
        };
        debug!("{} resolved to {:?}", host, addresses);

        select_address(host, addresses, mode)
    }

    /// Looks up the `_minecraft._tcp` SRV record for `host`.
    pub async fn resolve_srv(&self, host: &str) -> Result<SrvTarget, McQueryError> {
        let name = format!("{}.{}", JAVA_SRV_PREFIX, host.trim().trim_end_matches('.'));
        let lookup = self
            .resolver
            .srv_lookup(name.as_str())
            .await
            .map_err(|e| McQueryError::ResolutionError(format!("SRV lookup for {} failed: {}", name, e)))?;

        let records = lookup
            .iter()
            .map(|srv| SrvRecord {
                priority: srv.priority(),
                weight: srv.weight(),
                port: srv.port(),
                target: srv.target().to_utf8(),
            })
            .collect();

        pick_srv_record(records)
            .ok_or_else(|| McQueryError::ResolutionError("no SRV records found".to_string()))
    }
}

fn is_not_found(error: &ResolveError) -> bool {
    matches!(error.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

/// Parses plain and bracketed (`[::1]`) address literals.
pub fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let trimmed = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
    trimmed.parse().ok()
}

/// Applies the family preference to a resolved address list.
pub fn select_address(host: &str, addresses: Vec<IpAddr>, mode: IpMode) -> Result<Resolution, McQueryError> {
    let candidates: Vec<IpAddr> = match mode {
        IpMode::Auto => {
            let v4: Vec<IpAddr> = addresses.iter().copied().filter(IpAddr::is_ipv4).collect();
            if v4.is_empty() {
                addresses.into_iter().filter(IpAddr::is_ipv6).collect()
            } else {
                v4
            }
        }
        _ => addresses.into_iter().filter(|ip| mode.matches(ip)).collect(),
    };

    match candidates.first() {
        Some(selected) => Ok(Resolution {
            selected: *selected,
            addresses: candidates,
        }),
        None => Err(McQueryError::NoAddress {
            host: host.to_string(),
            mode,
        }),
    }
}

/// Lowest priority wins, ties go to the highest weight.
pub fn pick_srv_record(mut records: Vec<SrvRecord>) -> Option<SrvTarget> {
    records.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)));
    records.into_iter().next().map(|record| SrvTarget {
        host: record.target.trim_end_matches('.').to_string(),
        port: record.port,
    })
}
