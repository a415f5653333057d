use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use crate::config::ResolvedCredentials;
use crate::{Error, Result};

/// Source of raw AtomPub documents.
///
/// The walker and sync engine only ever need "GET this URL and hand me the
/// body"; authentication and connection handling live behind this seam.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the document at `url`.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] for any non-success status, [`Error::Network`]
    /// when the request could not be completed.
    async fn get(&self, url: &str) -> Result<String>;
}

/// Authenticated HTTP transport for the Hatena AtomPub API
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport that sends Basic credentials on every request
    pub fn new(credentials: &ResolvedCredentials, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&credentials.basic_auth_header())
            .map_err(|e| Error::Config(format!("Credentials are not valid header text: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/atom+xml, application/xml;q=0.9"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hatena-mcp/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Transport {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
