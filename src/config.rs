use crate::error::{ErrorContext, Result};
use crate::types::{Config, McQueryError};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "mcquery.toml";

pub fn load_config(config_path_str: &str) -> Result<Config> {
    let mut config = if Path::new(config_path_str).exists() {
        let contents = fs::read_to_string(config_path_str)
            .with_context(|| format!("Failed to read config file {}", config_path_str))?;
        toml::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse config file {}", config_path_str))?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

fn env_number(name: &str) -> Result<Option<i64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<i64>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}", name)),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(McQueryError::ConfigError(format!("Invalid value for {}: {}", name, other))),
        },
        Err(_) => Ok(None),
    }
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(v) = env_number("MCQUERY_TIMEOUT_SECS")? {
        config.query.timeout_secs = v;
    }
    if let Some(v) = env_number("MCQUERY_RETRY_COUNT")? {
        config.query.retry_count = v;
    }
    if let Some(v) = env_number("MCQUERY_RETRY_DELAY_MS")? {
        config.query.retry_delay_ms = v;
    }
    if let Some(v) = env_bool("MCQUERY_ENABLE_SRV")? {
        config.query.enable_srv = v;
    }
    if let Ok(mode) = env::var("MCQUERY_IP_MODE") {
        config.query.ip_mode = mode.trim().to_string();
    }
    if let Some(v) = env_number("MCQUERY_LOOKUP_CONCURRENCY")? {
        config.lookup.concurrency = v;
    }
    if let Some(v) = env_number("MCQUERY_LOOKUP_RATE_LIMIT")? {
        config.lookup.rate_limit = v;
    }
    Ok(())
}

pub fn validate_config(config: &Config) -> Result<()> {
    let checks = [
        ("query.timeout_secs", config.query.timeout_secs),
        ("query.retry_count", config.query.retry_count),
        ("query.retry_delay_ms", config.query.retry_delay_ms),
        ("lookup.concurrency", config.lookup.concurrency),
        ("lookup.rate_limit", config.lookup.rate_limit),
        ("lookup.max_duration_secs", config.lookup.max_duration_secs),
    ];
    for (name, value) in checks {
        if value < 0 {
            return Err(McQueryError::ConfigError(format!("{} must not be negative", name)));
        }
    }
    if config.lookup.rate_limit > u32::MAX as i64 {
        return Err(McQueryError::ConfigError("lookup.rate_limit is too large".to_string()));
    }
    config.query.ip_mode()?;
    Ok(())
}
