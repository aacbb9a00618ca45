use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::forecast::Forecast;
use crate::load_error::LoadError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Loads snapshot documents from a local path or an HTTP(S) URL.
#[derive(Clone)]
pub struct ForecastLoader {
    client: reqwest::Client,
}

impl ForecastLoader {
    pub fn new() -> Result<Self, LoadError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Loads and parses the document named by `identifier`.
    #[instrument(skip(self))]
    pub async fn load(&self, identifier: &str) -> Result<Forecast, LoadError> {
        let body = if is_remote(identifier) {
            self.fetch_remote(identifier).await?
        } else {
            read_local(identifier).await?
        };
        debug!("Retrieved snapshot, size: {} bytes", body.len());

        let forecast = Forecast::from_json_str(&body)?;
        info!(
            "Loaded forecast with {} hours and {} models",
            forecast.hours.len(),
            forecast.model_ids().len()
        );
        Ok(forecast)
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, LoadError> {
        let url = cache_busted(url, Utc::now().timestamp_millis());
        debug!("Sending HTTP request for snapshot: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if !status.is_success() {
            return Err(LoadError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

async fn read_local(path: &str) -> Result<String, LoadError> {
    debug!("Reading snapshot from file: {}", path);
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })
}

fn is_remote(identifier: &str) -> bool {
    identifier.starts_with("http://") || identifier.starts_with("https://")
}

/// Appends a `ts` query parameter so intermediaries never serve a stale copy.
fn cache_busted(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}ts={millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_busted_appends_query() {
        assert_eq!(
            cache_busted("https://example.org/data/latest.json", 42),
            "https://example.org/data/latest.json?ts=42"
        );
        assert_eq!(
            cache_busted("https://example.org/latest.json?v=2", 42),
            "https://example.org/latest.json?v=2&ts=42"
        );
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.org/latest.json"));
        assert!(is_remote("http://localhost:8080/latest.json"));
        assert!(!is_remote("data/latest.json"));
        assert!(!is_remote("/tmp/httpish.json"));
    }
}
