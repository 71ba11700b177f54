//! HTTP origin fetcher backed by reqwest.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use relay_core::constants::FETCH_DEADLINE_SECS;
use relay_core::error::OriginError;
use relay_engine::OriginFetcher;

/// Fetches origin URLs with a fixed deadline. Error bodies the origin
/// reports as JSON are returned as values so the pipeline can classify
/// them; undecodable bodies become [`OriginError`]s.
pub struct HttpOriginFetcher {
    client: Client,
}

impl HttpOriginFetcher {
    pub fn new() -> Result<Self, OriginError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_DEADLINE_SECS))
            .build()
            .map_err(|e| OriginError::Fetch {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetcher for HttpOriginFetcher {
    async fn fetch(&self, url: &str, access_token: Option<&str>) -> Result<Value, OriginError> {
        let mut request = self.client.get(url);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| OriginError::Fetch {
            reason: e.to_string(),
        })?;
        let status = response.status();

        let body = response.text().await.map_err(|e| OriginError::Fetch {
            reason: format!("failed to read body (status {status}): {e}"),
        })?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(OriginError::Fetch {
                reason: format!("origin returned status {status}"),
            }),
            Err(e) => Err(OriginError::BadBody {
                reason: e.to_string(),
            }),
        }
    }
}
