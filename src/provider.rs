//! Provider that issues paid proxies.

use crate::error::ProviderError;
use crate::proxy::Proxy;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Application-level code the Zhima API returns when called too often.
pub const THROTTLED_CODE: i64 = 111;

/// Source of candidate proxies for the backup queue.
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// Fetch one batch of candidate proxies from `api`.
    async fn fetch(&self, api: &Url) -> Result<Vec<Proxy>, ProviderError>;
}

/// Body returned by the Zhima "get ip" API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    data: Option<Vec<Proxy>>,
    #[serde(default)]
    msg: String,
}

/// Provider for the ZhimaHTTP API (JSON output format).
#[derive(Debug, Clone)]
pub struct ZhimaProvider {
    client: Client,
    throttle_backoff: Duration,
}

impl ZhimaProvider {
    /// Create a provider that backs off `throttle_backoff` when throttled.
    pub fn new(throttle_backoff: Duration) -> Self {
        Self::with_client(Client::new(), throttle_backoff)
    }

    /// Create a provider using an existing reqwest client.
    pub fn with_client(client: Client, throttle_backoff: Duration) -> Self {
        Self {
            client,
            throttle_backoff,
        }
    }
}

impl Default for ZhimaProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ProxyProvider for ZhimaProvider {
    async fn fetch(&self, api: &Url) -> Result<Vec<Proxy>, ProviderError> {
        let response = self.client.get(api.clone()).send().await?;
        let body = response.text().await?;
        parse_response(&body, self.throttle_backoff)
    }
}

/// Parse a Zhima API body into a batch of proxies.
pub fn parse_response(body: &str, throttle_backoff: Duration) -> Result<Vec<Proxy>, ProviderError> {
    let response: ApiResponse = serde_json::from_str(body)?;
    match response.code {
        0 => {
            let proxies = response.data.unwrap_or_default();
            debug!("Provider returned {} proxies", proxies.len());
            Ok(proxies)
        }
        THROTTLED_CODE => Err(ProviderError::Throttled {
            retry_after: throttle_backoff,
        }),
        code => Err(ProviderError::Api {
            code,
            message: response.msg,
        }),
    }
}
