// src/types.rs
use crate::engine::LookupResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub query: QuerySettings,
    pub lookup: LookupSettings,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
}

/// Retry and transport settings. Kept signed so that bad input can be
/// reported by validation instead of failing to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub timeout_secs: i64,
    pub retry_count: i64,
    pub retry_delay_ms: i64,
    pub enable_srv: bool,
    pub ip_mode: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            retry_count: 0,
            retry_delay_ms: 200,
            enable_srv: true,
            ip_mode: "auto".to_string(),
        }
    }
}

impl QuerySettings {
    pub fn ip_mode(&self) -> Result<IpMode, McQueryError> {
        self.ip_mode.parse()
    }

    pub fn execute_options(&self) -> Result<ExecuteOptions, McQueryError> {
        Ok(ExecuteOptions::from_signed(
            self.timeout_secs.saturating_mul(1000),
            self.retry_count,
            self.retry_delay_ms,
            self.enable_srv,
            self.ip_mode()?,
        ))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSettings {
    /// `0` picks a worker count from the available parallelism.
    pub concurrency: i64,
    /// Candidate starts per second, `0` for unlimited.
    pub rate_limit: i64,
    /// Overall lookup deadline in seconds, `0` for none.
    pub max_duration_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub use_system_resolver: bool,
    pub nameservers: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_system_resolver: true,
            nameservers: vec![
                "8.8.8.8:53".to_string(),
                "8.8.4.4:53".to_string(),
                "1.1.1.1:53".to_string(),
                "1.0.0.1:53".to_string(),
            ],
            timeout_secs: 5,
        }
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Which of the two server protocols a query speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    /// UDP unconnected ping/pong.
    Bedrock,
    /// TCP handshake + status request.
    Java,
}

impl Edition {
    pub fn default_port(self) -> u16 {
        match self {
            Edition::Bedrock => 19132,
            Edition::Java => 25565,
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Bedrock => write!(f, "bedrock"),
            Edition::Java => write!(f, "java"),
        }
    }
}

impl FromStr for Edition {
    type Err = McQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bedrock" => Ok(Edition::Bedrock),
            "java" => Ok(Edition::Java),
            other => Err(McQueryError::ConfigError(format!("unknown edition: {}", other))),
        }
    }
}

/// Address family preference used when resolving a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpMode {
    #[default]
    Auto,
    Ipv4,
    Ipv6,
}

impl IpMode {
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpMode::Auto => true,
            IpMode::Ipv4 => ip.is_ipv4(),
            IpMode::Ipv6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpMode::Auto => write!(f, "auto"),
            IpMode::Ipv4 => write!(f, "ipv4"),
            IpMode::Ipv6 => write!(f, "ipv6"),
        }
    }
}

impl FromStr for IpMode {
    type Err = McQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(IpMode::Auto),
            "ipv4" | "v4" => Ok(IpMode::Ipv4),
            "ipv6" | "v6" => Ok(IpMode::Ipv6),
            other => Err(McQueryError::ConfigError(format!("invalid IP mode: {}", other))),
        }
    }
}

/// Status advertised in a Bedrock unconnected pong.
///
/// Every field is kept as text: the advertise string is semicolon separated
/// and servers routinely send short or malformed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedrockStatus {
    pub game_id: String,
    pub motd: String,
    pub protocol_version: String,
    pub game_version: String,
    pub current_players: String,
    pub max_players: String,
    pub clean_motd: String,
}

impl fmt::Display for BedrockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Edition: Bedrock")?;
        writeln!(f, "GameID: {}", self.game_id)?;
        writeln!(f, "MOTD: {}", self.motd)?;
        writeln!(f, "CleanMOTD: {}", self.clean_motd)?;
        writeln!(f, "ProtocolVersion: {}", self.protocol_version)?;
        writeln!(f, "GameVersion: {}", self.game_version)?;
        write!(f, "Players: {}/{}", self.current_players, self.max_players)
    }
}

/// Status returned by a Java server list ping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaStatus {
    pub version_name: String,
    pub protocol_version: i64,
    pub current_players: i64,
    pub max_players: i64,
    pub motd: String,
    pub clean_motd: String,
    pub latency_millis: i64,
}

impl fmt::Display for JavaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Edition: Java")?;
        writeln!(f, "MOTD: {}", self.motd)?;
        writeln!(f, "CleanMOTD: {}", self.clean_motd)?;
        writeln!(f, "Version: {}", self.version_name)?;
        writeln!(f, "Protocol: {}", self.protocol_version)?;
        writeln!(f, "Players: {}/{}", self.current_players, self.max_players)?;
        write!(f, "Latency(ms): {}", self.latency_millis)
    }
}

/// Normalized result of one successful query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edition", rename_all = "lowercase")]
pub enum ServerStatus {
    Bedrock(BedrockStatus),
    Java(JavaStatus),
}

impl ServerStatus {
    pub fn edition(&self) -> Edition {
        match self {
            ServerStatus::Bedrock(_) => Edition::Bedrock,
            ServerStatus::Java(_) => Edition::Java,
        }
    }

    /// Multi-line human readable summary.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Bedrock(status) => status.fmt(f),
            ServerStatus::Java(status) => status.fmt(f),
        }
    }
}

/// Retry/transport options shared by direct queries and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub enable_srv: bool,
    pub ip_mode: IpMode,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            retry_count: 0,
            retry_delay: Duration::from_millis(200),
            enable_srv: true,
            ip_mode: IpMode::Auto,
        }
    }
}

impl ExecuteOptions {
    /// Builds options from signed settings values, clamping negatives to zero.
    pub fn from_signed(
        timeout_ms: i64,
        retry_count: i64,
        retry_delay_ms: i64,
        enable_srv: bool,
        ip_mode: IpMode,
    ) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms.max(0) as u64),
            retry_count: retry_count.clamp(0, u32::MAX as i64) as u32,
            retry_delay: Duration::from_millis(retry_delay_ms.max(0) as u64),
            enable_srv,
            ip_mode,
        }
    }
}

/// Input for a single query (with its retries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteConfig {
    pub edition: Edition,
    pub host: String,
    /// `0` selects the edition's default port.
    pub port: u16,
    /// Per-attempt bound; zero means no per-attempt cap.
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub enable_srv: bool,
    pub ip_mode: IpMode,
}

impl ExecuteConfig {
    pub fn new(edition: Edition, host: impl Into<String>, port: u16, options: &ExecuteOptions) -> Self {
        Self {
            edition,
            host: host.into(),
            port,
            timeout: options.timeout,
            retry_count: options.retry_count,
            retry_delay: options.retry_delay,
            enable_srv: options.enable_srv,
            ip_mode: options.ip_mode,
        }
    }
}

/// Diagnostics collected for every query, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteDetails {
    pub requested_host: String,
    pub requested_port: u16,
    pub dial_host: Option<String>,
    pub dial_port: Option<u16>,
    pub selected_ip: Option<IpAddr>,
    pub resolved_ips: Vec<IpAddr>,
    pub srv_used: bool,
    pub srv_host: Option<String>,
    pub srv_port: Option<u16>,
    pub srv_error: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl ExecuteDetails {
    pub fn requested(host: &str, port: u16) -> Self {
        Self {
            requested_host: host.to_string(),
            requested_port: port,
            ..Default::default()
        }
    }

    /// Folds the details of a later attempt into these.
    ///
    /// Fields the later attempt filled in win; fields it left empty keep
    /// their previous value.
    pub fn merge(&mut self, next: ExecuteDetails) {
        if next.dial_host.is_some() {
            self.dial_host = next.dial_host;
        }
        if next.dial_port.is_some() {
            self.dial_port = next.dial_port;
        }
        if next.selected_ip.is_some() {
            self.selected_ip = next.selected_ip;
        }
        if !next.resolved_ips.is_empty() {
            self.resolved_ips = next.resolved_ips;
        }
        if next.srv_used {
            self.srv_used = true;
        }
        if next.srv_host.is_some() {
            self.srv_host = next.srv_host;
        }
        if next.srv_port.is_some() {
            self.srv_port = next.srv_port;
        }
        if next.srv_error.is_some() {
            self.srv_error = next.srv_error;
        }
    }
}

#[derive(Debug, Error)]
pub enum McQueryError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("No {mode} address found for {host}")]
    NoAddress { host: String, mode: IpMode },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout while querying {host}:{port}")]
    TimeoutError { host: String, port: u16 },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Lookup cancelled after {}/{} candidates", .partial.completed, .partial.attempts)]
    LookupCancelled { partial: Box<LookupResult> },

    #[error("Request failed")]
    RequestFailed,
}

impl McQueryError {
    /// Partial lookup progress carried by a cancelled lookup.
    pub fn partial_lookup(&self) -> Option<&LookupResult> {
        match self {
            McQueryError::LookupCancelled { partial } => Some(partial),
            _ => None,
        }
    }
}
