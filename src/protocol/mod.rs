// src/protocol/mod.rs
//! Wire codecs for the two status protocols. Nothing in here touches a socket.

pub mod bedrock;
pub mod framing;
pub mod java;

use regex::Regex;
use std::sync::OnceLock;

fn formatting_codes() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\x{00A7}[0-9A-FK-OR]").expect("formatting code pattern is valid"))
}

/// Removes `§` color/style codes from a message of the day.
pub fn strip_formatting(text: &str) -> String {
    formatting_codes().replace_all(text, "").into_owned()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
