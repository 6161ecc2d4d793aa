//! HTTP transport over reqwest.

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use crate::error::FetchError;

use super::backend::{FetchedResponse, NetworkBackend, Request};

/// Transport-level request timeout in seconds. This bounds every fetch
/// regardless of rule settings; a rule timeout of 0 waits up to this long.
const TRANSPORT_TIMEOUT_SECS: u64 = 120;

/// Real network backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NetworkBackend for HttpBackend {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| FetchError::NetworkFailure(format!("Invalid method '{}'", request.method)))?;

        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::NetworkTimeout(TRANSPORT_TIMEOUT_SECS)
                } else {
                    FetchError::NetworkFailure(e.to_string())
                }
            })?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkFailure(e.to_string()))?
            .to_vec();

        if !status.is_success() {
            return Err(FetchError::from_status(
                status.as_u16(),
                &String::from_utf8_lossy(&body),
            ));
        }

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Fetched");

        Ok(FetchedResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}
