use crate::types::{Edition, IpMode};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mcquery",
    about = "Query Minecraft Bedrock and Java servers",
    long_about = "mcquery asks Minecraft servers for their status.\nBedrock servers are pinged over RakNet/UDP, Java servers through the TCP server list ping.\nThe lookup command probes every subdomain/ending combination of a base name.",
    version = crate::VERSION,
    long_version = crate::LONG_VERSION
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config_path: Option<String>,

    /// Output in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Output file
    #[arg(short = 'o', long = "output", value_name = "FILE", global = true)]
    pub output_file: Option<String>,

    /// Verbose mode (query diagnostics, debug logging)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Silent mode (no banner or progress)
    #[arg(long = "silent", global = true)]
    pub silent: bool,

    /// Per-attempt timeout in seconds, 0 for none
    #[arg(short = 't', long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<i64>,

    /// Extra attempts after the first
    #[arg(short = 'r', long = "retries", global = true)]
    pub retries: Option<i64>,

    /// Delay between attempts in milliseconds
    #[arg(long = "retry-delay", value_name = "MS", global = true)]
    pub retry_delay: Option<i64>,

    /// Skip the _minecraft._tcp SRV lookup for Java servers
    #[arg(long = "no-srv", global = true)]
    pub no_srv: bool,

    /// Address family to connect with
    #[arg(long = "ip-mode", value_parser = parse_ip_mode, global = true)]
    pub ip_mode: Option<IpMode>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query a single server
    Query(QueryArgs),
    /// Probe subdomain and ending combinations of a base name
    Lookup(LookupArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct QueryArgs {
    #[arg(short = 'e', long = "edition", value_parser = parse_edition)]
    pub edition: Edition,

    #[arg(short = 'H', long = "host")]
    pub host: String,

    /// Server port, edition default when omitted
    #[arg(short = 'p', long = "port", default_value = "")]
    pub port: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LookupArgs {
    #[arg(short = 'e', long = "edition", value_parser = parse_edition)]
    pub edition: Edition,

    /// Base name, e.g. `hypixel`
    #[arg(short = 'b', long = "base")]
    pub base: String,

    /// Subdomains (comma-separated), empty entry means none
    #[arg(short = 's', long = "subdomains", default_value = "")]
    pub subdomains: String,

    /// File with one subdomain per line
    #[arg(long = "subdomains-file", value_name = "FILE")]
    pub subdomains_file: Option<PathBuf>,

    /// Add the built-in subdomain pool
    #[arg(long = "subdomain-pool")]
    pub subdomain_pool: bool,

    /// Domain endings (comma-separated)
    #[arg(short = 'd', long = "endings", default_value = "")]
    pub endings: String,

    /// Add the IANA ending pool, falling back to the built-in list
    #[arg(long = "ending-pool")]
    pub ending_pool: bool,

    #[arg(short = 'p', long = "port", default_value = "")]
    pub port: String,

    /// Worker count, 0 for automatic
    #[arg(long = "concurrency")]
    pub concurrency: Option<i64>,

    /// Candidates started per second, 0 for unlimited
    #[arg(long = "rate-limit")]
    pub rate_limit: Option<i64>,

    /// Stop the lookup after this many seconds
    #[arg(long = "max-duration", value_name = "SECS")]
    pub max_duration: Option<i64>,
}

fn parse_edition(value: &str) -> Result<Edition, String> {
    value.parse().map_err(|e: crate::types::McQueryError| e.to_string())
}

fn parse_ip_mode(value: &str) -> Result<IpMode, String> {
    value.parse().map_err(|e: crate::types::McQueryError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_command() {
        let args = Args::parse_from([
            "mcquery", "query", "-e", "java", "-H", "example.com", "--json", "--retries", "2", "--ip-mode", "v6",
        ]);
        assert!(args.json);
        assert_eq!(args.retries, Some(2));
        assert_eq!(args.ip_mode, Some(IpMode::Ipv6));
        match args.command {
            Command::Query(q) => {
                assert_eq!(q.edition, Edition::Java);
                assert_eq!(q.host, "example.com");
                assert_eq!(q.port, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_lookup_command() {
        let args = Args::parse_from([
            "mcquery", "--silent", "lookup", "-e", "bedrock", "-b", "demo", "-s", "play,mc", "-d", "com,net",
            "--ending-pool", "--rate-limit", "20",
        ]);
        assert!(args.silent);
        match args.command {
            Command::Lookup(l) => {
                assert_eq!(l.edition, Edition::Bedrock);
                assert_eq!(l.base, "demo");
                assert_eq!(l.subdomains, "play,mc");
                assert!(l.ending_pool);
                assert!(!l.subdomain_pool);
                assert_eq!(l.rate_limit, Some(20));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_edition() {
        assert!(Args::try_parse_from(["mcquery", "query", "-e", "pocket", "-H", "x"]).is_err());
    }
}
