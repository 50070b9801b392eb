// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod probe;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod sources;
pub mod types;
pub mod utils;

pub use cli::Args;
pub use engine::{lookup_domains, LookupConfig, LookupMatch, LookupProgress, LookupResult};
pub use resolver::HostResolver;
pub use session::{Execution, ServerProbe, Session};
pub use types::{
    BedrockStatus, Config, Edition, ExecuteConfig, ExecuteDetails, ExecuteOptions, IpMode, JavaStatus, McQueryError,
    ServerStatus,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);
