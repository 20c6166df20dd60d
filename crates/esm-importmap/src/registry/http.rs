//! HTTP registry backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Registry, RegistryResponse};
use crate::Result;

const USER_AGENT: &str = concat!("esm-importmap/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry implementation that issues real HTTP requests.
///
/// `reqwest::Client` pools connections internally, so one instance should be
/// shared for the life of the process.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: reqwest::Client,
}

impl HttpRegistry {
    /// Create a registry client with the default user agent and timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a registry client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn get(&self, url: &str) -> Result<RegistryResponse> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RegistryResponse::new(status, body.to_vec()))
    }
}
