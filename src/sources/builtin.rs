// src/sources/builtin.rs
/// Endings that are always probed when the pool is requested.
pub const BUILTIN_ENDINGS: &[&str] = &[
    "com", "net", "org", "de", "eu", "io", "gg", "me", "co", "uk", "co.uk", "fr", "nl", "be", "at", "ch",
    "it", "es", "pl", "cz", "sk", "hu", "ro", "ru", "ua", "se", "no", "dk", "fi", "pt", "us", "ca", "au",
    "nz", "br", "mx", "ar", "in", "jp", "kr", "cn", "tw", "sg", "tr", "info", "biz", "xyz", "online",
    "club", "fun", "games", "host", "network", "pro", "world", "cloud", "space", "site", "tv", "cc",
];

/// Subdomain prefixes commonly used for game servers.
pub const SUBDOMAIN_POOL: &[&str] = &[
    "", "play", "mc", "minecraft", "server", "srv", "hub", "lobby", "join", "go", "pvp", "survival",
    "skyblock", "bedrock", "pe", "java", "node", "node1", "eu", "us", "de", "game", "games", "net",
];
