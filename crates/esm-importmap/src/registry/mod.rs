//! Registry transport abstraction.
//!
//! The metadata fetcher never talks HTTP directly; it goes through the
//! [`Registry`] trait so the cache and dedup logic can run against an
//! in-process registry in tests.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────┐
//! │ MetadataFetcher  │─────▶│  Registry    │
//! │  memory cache    │      │  .get(url)   │
//! │  keyed mutex     │      └──────┬───────┘
//! │  disk cache      │             │
//! └──────────────────┘     ┌───────┴────────┐
//!                          ▼                ▼
//!                   HttpRegistry      MockRegistry
//!                    (reqwest)        (test-utils)
//! ```

mod http;

pub use http::HttpRegistry;

use async_trait::async_trait;

use crate::Result;

/// A raw answer from the CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RegistryResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The body as text, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Fetches documents from a registry-fronting CDN.
///
/// Implementations report transport failures as [`crate::Error::Http`] and
/// return every HTTP answer, whatever its status, as a [`RegistryResponse`].
#[async_trait]
pub trait Registry: Send + Sync + std::fmt::Debug {
    /// Issue a GET request for `url`.
    async fn get(&self, url: &str) -> Result<RegistryResponse>;
}
