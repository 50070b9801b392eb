use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use mcquery::cli::{Args, Command, LookupArgs, QueryArgs};
use mcquery::config::{load_config, validate_config, DEFAULT_CONFIG_PATH};
use mcquery::engine::{lookup_domains, LookupConfig, LookupProgress, ProgressCallback};
use mcquery::output::OutputManager;
use mcquery::sources::{EndingCache, IanaSource, SUBDOMAIN_POOL};
use mcquery::types::{Config, ExecuteConfig, OutputFormat};
use mcquery::utils::{parse_port, read_lines, split_list};
use mcquery::{HostResolver, McQueryError, ServerProbe, Session};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BANNER: &str = r#"
  _ __ ___   ___ __ _ _   _  ___ _ __ _   _
 | '_ ` _ \ / __/ _` | | | |/ _ \ '__| | | |
 | | | | | | (_| (_| | |_| |  __/ |  | |_| |
 |_| |_| |_|\___\__, |\__,_|\___|_|   \__, |
                   |_|                 |___/
        Bedrock & Java server status
"#;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else if args.silent {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    let config_path = args.config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = load_config(config_path).context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &args)?;

    let resolver = Arc::new(HostResolver::new(&config.resolver)?);
    let session = Arc::new(Session::new(resolver));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            interrupt.cancel();
        }
    });

    let output = OutputManager::new(config.output.clone());

    match &args.command {
        Command::Query(query) => run_query(session, &config, query, &output, &cancel).await,
        Command::Lookup(lookup) => run_lookup(session, &config, lookup, &output, &cancel, args.silent).await,
    }
}

fn apply_cli_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(timeout) = args.timeout {
        config.query.timeout_secs = timeout;
    }
    if let Some(retries) = args.retries {
        config.query.retry_count = retries;
    }
    if let Some(delay) = args.retry_delay {
        config.query.retry_delay_ms = delay;
    }
    if args.no_srv {
        config.query.enable_srv = false;
    }
    if let Some(mode) = args.ip_mode {
        config.query.ip_mode = mode.to_string();
    }
    if let Command::Lookup(lookup) = &args.command {
        if let Some(concurrency) = lookup.concurrency {
            config.lookup.concurrency = concurrency;
        }
        if let Some(rate) = lookup.rate_limit {
            config.lookup.rate_limit = rate;
        }
        if let Some(secs) = lookup.max_duration {
            config.lookup.max_duration_secs = secs;
        }
    }
    if args.json {
        config.output.format = OutputFormat::Json;
    }
    if args.output_file.is_some() {
        config.output.file = args.output_file.clone();
    }
    if args.verbose {
        config.output.verbose = true;
    }

    validate_config(config)?;
    Ok(())
}

async fn run_query(
    session: Arc<Session>,
    config: &Config,
    query: &QueryArgs,
    output: &OutputManager,
    cancel: &CancellationToken,
) -> Result<()> {
    let options = config.query.execute_options()?;
    let port = parse_port(&query.port)?;
    let request = ExecuteConfig::new(query.edition, query.host.clone(), port, &options);

    let (result, details) = ServerProbe::execute(session.as_ref(), request, cancel).await;
    output.write_query(&result, &details)?;

    if let Err(e) = result {
        error!("Query failed: {}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run_lookup(
    session: Arc<Session>,
    config: &Config,
    lookup: &LookupArgs,
    output: &OutputManager,
    cancel: &CancellationToken,
    silent: bool,
) -> Result<()> {
    let mut subdomains = split_list(&lookup.subdomains);
    if let Some(path) = &lookup.subdomains_file {
        subdomains.extend(read_lines(path).with_context(|| format!("Failed to read {:?}", path))?);
    }
    if lookup.subdomain_pool {
        subdomains.extend(SUBDOMAIN_POOL.iter().map(|s| s.to_string()));
    }

    let mut endings = split_list(&lookup.endings);
    if lookup.ending_pool {
        let cache = EndingCache::new();
        let pool = cache.load_or_reuse(&IanaSource::new()).await;
        if let Some(reason) = &pool.fallback_reason {
            warn!("Using built-in ending pool: {}", reason);
        }
        endings.extend(pool.endings.iter().cloned());
    }

    let bar = if silent {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    };
    let progress_bar = bar.clone();
    let progress: ProgressCallback = Arc::new(move |p: &LookupProgress| {
        progress_bar.set_length(p.total as u64);
        progress_bar.set_position(p.completed as u64);
        progress_bar.set_message(p.host.clone());
    });

    let lookup_config = LookupConfig {
        edition: lookup.edition,
        port: parse_port(&lookup.port)?,
        base_host: lookup.base.clone(),
        subdomains,
        domain_endings: endings,
        concurrency: config.lookup.concurrency as usize,
        rate_limit: config.lookup.rate_limit as u32,
        max_duration: Some(Duration::from_secs(config.lookup.max_duration_secs as u64)).filter(|d| !d.is_zero()),
        options: config.query.execute_options()?,
        progress: Some(progress),
    };

    let probe: Arc<dyn ServerProbe> = session;
    let outcome = lookup_domains(probe, lookup_config, cancel).await;
    bar.finish_and_clear();

    match outcome {
        Ok(result) => {
            output.write_lookup(&result, false)?;
            Ok(())
        }
        Err(McQueryError::LookupCancelled { partial }) => {
            info!("Lookup stopped early, printing partial results");
            output.write_lookup(&partial, true)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
