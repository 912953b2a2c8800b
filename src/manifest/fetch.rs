//! Manifest text fetching
//!
//! The resolver only needs "give me the text at this URL". HTTP(S) URLs go
//! through reqwest; everything else is read from the local filesystem, with
//! an optional `file://` prefix.

use std::time::Duration;

use async_trait::async_trait;

use crate::common::{config::Config, Error, Result};

const FILE_SCHEME: &str = "file://";

/// Fetches manifest text by URL
#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// Fetch the full text at `url`
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Fetcher for `http://` and `https://` URLs
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/plain")
            .send()
            .await
            .map_err(|e| Error::fetch(url, e))?;

        if !response.status().is_success() {
            return Err(Error::fetch(
                url,
                format!("server returned {}", response.status()),
            ));
        }

        response.text().await.map_err(|e| Error::fetch(url, e))
    }
}

/// Fetcher for local paths and `file://` URLs
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

#[async_trait]
impl TextFetcher for FileFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let path = url.strip_prefix(FILE_SCHEME).unwrap_or(url);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::fetch(url, e))
    }
}

/// Picks the HTTP or file fetcher from the URL scheme
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(user_agent, timeout)?,
            file: FileFetcher,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.fetch.user_agent, config.timeouts.fetch())
    }
}

#[async_trait]
impl TextFetcher for DefaultFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "loading");
        let result = if is_http(url) {
            self.http.fetch_text(url).await
        } else {
            self.file.fetch_text(url).await
        };

        match &result {
            Ok(text) => tracing::debug!(url, bytes = text.len(), "loaded"),
            Err(e) => tracing::warn!(url, error = %e, "failed to load"),
        }
        result
    }
}

fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_detection() {
        assert!(is_http("http://localhost:8000/list.txt"));
        assert!(is_http("HTTPS://example.org/list.txt"));
        assert!(!is_http("file:///tmp/list.txt"));
        assert!(!is_http("suite/list.txt"));
        assert!(!is_http("h"));
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_plain_and_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a.html\n").unwrap();

        let plain = path.to_string_lossy().into_owned();
        assert_eq!(FileFetcher.fetch_text(&plain).await.unwrap(), "a.html\n");

        let url = format!("file://{}", plain);
        assert_eq!(FileFetcher.fetch_text(&url).await.unwrap(), "a.html\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let err = FileFetcher
            .fetch_text("/definitely/not/here/list.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
