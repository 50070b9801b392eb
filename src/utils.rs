// src/utils.rs
use crate::types::McQueryError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads lines from a file, skipping blanks and `#` comments.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed.to_string());
    }
    Ok(lines)
}

/// Parses a user supplied port. An empty value yields `0` ("use default").
pub fn parse_port(value: &str) -> Result<u16, McQueryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let port: i64 = trimmed
        .parse()
        .map_err(|_| McQueryError::ConfigError("invalid port".to_string()))?;
    if !(1..=65535).contains(&port) {
        return Err(McQueryError::ConfigError("port out of range (1-65535)".to_string()));
    }
    Ok(port as u16)
}

/// Splits a comma and/or whitespace separated list.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercases and de-duplicates subdomain prefixes.
///
/// An empty entry means "no subdomain" and is kept once.
pub fn normalize_subdomains(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut list = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_lowercase();
        if seen.insert(value.clone()) {
            list.push(value);
        }
    }
    list
}

pub fn normalize_ending(value: &str) -> String {
    let value = value.trim().to_lowercase();
    value.strip_prefix('.').unwrap_or(&value).to_string()
}

/// Normalizes domain endings, dropping empties and duplicates.
pub fn normalize_endings(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut list = Vec::with_capacity(values.len());
    for value in values {
        let value = normalize_ending(value);
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.clone()) {
            list.push(value);
        }
    }
    list
}

/// Joins `subdomain.base.ending`, leaving out empty parts.
pub fn build_host(subdomain: &str, base_host: &str, ending: &str) -> String {
    [subdomain, base_host, ending]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("").unwrap(), 0);
        assert_eq!(parse_port("25565").unwrap(), 25565);
        assert_eq!(parse_port(" 19132 ").unwrap(), 19132);
        assert!(parse_port("abc").is_err());
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert_eq!(
            parse_port("70000").unwrap_err().to_string(),
            "Configuration error: port out of range (1-65535)"
        );
    }

    #[test]
    fn test_normalize_subdomains() {
        let list = normalize_subdomains(&strings(&[" Play", "play", "", "MC ", "  ", "mc"]));
        assert_eq!(list, strings(&["play", "", "mc"]));
    }

    #[test]
    fn test_normalize_endings() {
        let list = normalize_endings(&strings(&[".COM", "com", " net ", "", ".", "..de"]));
        assert_eq!(list, strings(&["com", "net", ".de"]));
    }

    #[test]
    fn test_build_host() {
        assert_eq!(build_host("", "base", "com"), "base.com");
        assert_eq!(build_host("play", "base", "net"), "play.base.net");
        assert_eq!(build_host("play", "base", ""), "play.base");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("play, mc  hub,,"), strings(&["play", "mc", "hub"]));
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_read_lines_skips_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# endings").unwrap();
        writeln!(file, "com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  net ").unwrap();
        assert_eq!(read_lines(file.path()).unwrap(), strings(&["com", "net"]));
    }
}
