//! HTTP client opening ICY stream sessions
//!
//! # Example
//!
//! ```no_run
//! use pmoicy::IcyClient;
//! use tokio::io::AsyncReadExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = IcyClient::builder().metadata(true).build()?;
//!     let mut session = client.connect("http://radio.example.com/stream").await?;
//!
//!     if let Some(mut metadata) = session.take_metadata() {
//!         tokio::spawn(async move {
//!             while let Some(meta) = metadata.recv().await {
//!                 println!("Now playing: {:?}", meta.stream_title());
//!             }
//!         });
//!     }
//!
//!     let mut audio = vec![0u8; 4096];
//!     let n = session.read(&mut audio).await?;
//!     println!("{} audio bytes", n);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use tokio_util::io::StreamReader;
use tracing::{debug, info};
use url::Url;

use crate::config::{IcyConfig, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::error::{Error, Result};
use crate::headers::{metaint_from_headers, IcyHeaders, ICY_METADATA};
use crate::reader::IcyMetadataReader;
use crate::session::{BodyReader, IcySession, SessionBody};

/// Client for Icecast/Shoutcast streams.
///
/// Holds the HTTP client and the metadata opt-in flag. Cloning is cheap and
/// shares the connection pool.
#[derive(Debug, Clone)]
pub struct IcyClient {
    client: Client,
    metadata: bool,
}

impl IcyClient {
    /// Create a client with default settings (metadata not requested)
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from a configuration
    pub fn from_config(config: &IcyConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Create a client with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom TLS settings
    pub fn with_client(client: Client, metadata: bool) -> Self {
        Self { client, metadata }
    }

    /// Whether sessions request interleaved metadata
    pub fn requests_metadata(&self) -> bool {
        self.metadata
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Open a stream.
    ///
    /// Sends a single GET, with `Icy-MetaData: 1` when metadata is requested.
    /// When requested and the response announces `icy-metaint`, the body is
    /// wrapped in an [`IcyMetadataReader`] and the session carries the
    /// metadata receiver; otherwise the body is passed through untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if `url` does not parse
    /// - [`Error::Http`] on connection or transport failure
    /// - [`Error::UnexpectedStatus`] on a non-2xx response
    /// - [`Error::InvalidMetaint`] if `icy-metaint` is not a positive integer
    pub async fn connect(&self, url: &str) -> Result<IcySession> {
        let url = Url::parse(url)?;

        let mut request = self.client.get(url.clone());
        if self.metadata {
            request = request.header(ICY_METADATA, "1");
        }
        let request = request.build()?;
        let request_headers = request.headers().clone();

        debug!("Connecting to {} (metadata requested: {})", url, self.metadata);
        let response = self.client.execute(request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let headers = response.headers().clone();
        let metaint = if self.metadata {
            metaint_from_headers(&headers)?
        } else {
            None
        };
        let icy = IcyHeaders::from_headers(&headers);

        let body: BodyReader = StreamReader::new(
            response
                .bytes_stream()
                .map_err(std::io::Error::other)
                .boxed(),
        );

        let (body, metadata) = match metaint {
            Some(interval) => {
                let (reader, receiver) = IcyMetadataReader::new(body, interval);
                (SessionBody::Interleaved(reader), Some(receiver))
            }
            None => {
                if self.metadata {
                    debug!("{} sent no icy-metaint, passing the body through", url);
                }
                (SessionBody::Raw(body), None)
            }
        };

        info!(
            "ICY session open: {} (status {}, station {:?}, metaint {:?})",
            url,
            status,
            icy.name.as_deref().unwrap_or("unknown"),
            metaint
        );

        Ok(IcySession {
            url,
            request_headers,
            status,
            headers,
            icy,
            metaint,
            body,
            metadata,
        })
    }
}

/// Open a stream with a client built from `config`.
///
/// Convenience for one-shot use; keep an [`IcyClient`] around to reuse its
/// connection pool across sessions.
pub async fn connect(url: &str, config: &IcyConfig) -> Result<IcySession> {
    IcyClient::from_config(config)?.connect(url).await
}

/// Builder for configuring an IcyClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    metadata: bool,
    user_agent: String,
    connect_timeout: Duration,
    proxy: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            metadata: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            proxy: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a configuration
    pub fn from_config(config: &IcyConfig) -> Self {
        Self {
            client: None,
            metadata: config.metadata,
            user_agent: config.user_agent.clone(),
            connect_timeout: config.connect_timeout(),
            proxy: config.proxy.clone(),
        }
    }

    /// Set a custom HTTP client (user agent, timeout and proxy are then ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Request interleaved metadata
    pub fn metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<IcyClient> {
        let client = if let Some(client) = self.client {
            client
        } else {
            let mut builder = Client::builder()
                .user_agent(&self.user_agent)
                .connect_timeout(self.connect_timeout);

            if let Some(proxy_url) = &self.proxy {
                builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
            }

            builder.build()?
        };

        Ok(IcyClient {
            client,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = IcyClient::new().unwrap();
        assert!(!client.requests_metadata());
    }

    #[test]
    fn test_builder_from_config() {
        let client = IcyClient::from_config(&IcyConfig::with_metadata()).unwrap();
        assert!(client.requests_metadata());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = IcyClient::builder().proxy("http://[::1").build();
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = IcyClient::new().unwrap();
        let result = client.connect("not a url").await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
