//! HTTP access to map services.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;
use wms_common::{Credentials, FetchError, FetchResult};

/// Something that can retrieve a document from a map service.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`, optionally with basic-auth credentials.
    ///
    /// Non-success HTTP statuses and empty bodies are errors.
    async fn fetch(&self, url: &Url, credentials: Option<&Credentials>) -> FetchResult<Bytes>;
}

/// [`Fetcher`] backed by a reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("qwc-themes/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, credentials), fields(url = %url))]
    async fn fetch(&self, url: &Url, credentials: Option<&Credentials>) -> FetchResult<Bytes> {
        let mut request = self.client.get(url.clone());
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        if body.is_empty() {
            return Err(FetchError::EmptyResponse {
                url: url.to_string(),
            });
        }

        debug!(bytes = body.len(), "Fetched response");
        Ok(body)
    }
}
