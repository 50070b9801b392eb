// src/sources/iana.rs
use crate::sources::EndingSource;
use crate::types::McQueryError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const IANA_TLD_URL: &str = "https://data.iana.org/TLD/tlds-alpha-by-domain.txt";

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// IANA's root zone TLD list.
#[derive(Debug, Clone)]
pub struct IanaSource {
    url: String,
    client: Client,
}

impl Default for IanaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IanaSource {
    pub fn new() -> Self {
        Self::with_url(IANA_TLD_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EndingSource for IanaSource {
    fn name(&self) -> &str {
        "iana"
    }

    async fn fetch(&self) -> Result<Vec<String>, McQueryError> {
        let response = self.client.get(&self.url).timeout(FETCH_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(McQueryError::NetworkError(format!("IANA returned status: {}", response.status())));
        }

        let body = response.text().await?;
        let endings = parse_tld_list(&body);
        if endings.is_empty() {
            return Err(McQueryError::ProtocolError("IANA list contained no endings".to_string()));
        }
        Ok(endings)
    }
}

fn parse_tld_list(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "# Version 2024010100, Last Updated Mon Jan  1 07:07:01 2024 UTC\nAAA\nCOM\n\nXN--P1AI\n";

    #[test]
    fn test_parse_tld_list() {
        assert_eq!(parse_tld_list(BODY), vec!["aaa", "com", "xn--p1ai"]);
    }

    #[tokio::test]
    async fn test_fetch_from_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tlds.txt")
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let source = IanaSource::with_url(format!("{}/tlds.txt", server.url()));
        let endings = source.fetch().await.unwrap();
        assert_eq!(endings, vec!["aaa", "com", "xn--p1ai"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status_and_empty_list() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing").with_status(404).create_async().await;
        server
            .mock("GET", "/empty")
            .with_status(200)
            .with_body("# nothing here\n")
            .create_async()
            .await;

        let missing = IanaSource::with_url(format!("{}/missing", server.url()));
        assert!(missing.fetch().await.unwrap_err().to_string().contains("404"));

        let empty = IanaSource::with_url(format!("{}/empty", server.url()));
        assert!(matches!(empty.fetch().await.unwrap_err(), McQueryError::ProtocolError(_)));
    }
}
