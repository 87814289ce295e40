//! reqwest-backed gateway.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shopshell_core::{RequestContext, StoredResponse};

use crate::gateway::{FetchMode, Gateway, GatewayError, GatewayResult};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// User agent string.
    pub user_agent: String,
    /// Transport-level request timeout.
    pub timeout: Duration,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            user_agent: "shopshell/0.1".to_string(),
            timeout: Duration::from_secs(20),
            max_redirects: 5,
        }
    }
}

/// Origin gateway over a shared reqwest client.
pub struct HttpGateway {
    http: Client,
}

impl HttpGateway {
    /// Create a gateway with the given configuration.
    pub fn new(config: HttpGatewayConfig) -> GatewayResult<Self> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch(
        &self,
        request: &RequestContext,
        mode: FetchMode,
    ) -> GatewayResult<StoredResponse> {
        let mut builder = self.http.get(request.url.clone());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if mode == FetchMode::NoStore {
            // The wire form of "do not let an intermediary answer this".
            builder = builder.header("Cache-Control", "no-cache").header("Pragma", "no-cache");
        }

        let response = builder.send().await.map_err(|e| GatewayError::Unreachable {
            url: request.url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Unreachable {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?
            .to_vec();

        // A server-side transport always sees the full payload, so nothing
        // fetched here is opaque.
        Ok(StoredResponse::new(status, headers, body))
    }
}
