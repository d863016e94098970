use async_trait::async_trait;

/// Error returned by a [`Transport`] when no HTTP status could be obtained.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request to loki failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to build http client: {0}")]
    Client(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable capability that delivers an encoded push payload to Loki.
///
/// The batching worker calls `push` from its own task and never from an
/// application thread. Implementations own the endpoint, headers and
/// timeouts; the worker only looks at the returned status.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` (a JSON push request) to the backend.
    ///
    /// **Returns**
    /// - `Ok(status)` once the backend answered, whatever the status is.
    /// - `Err(..)` on connection errors, timeouts and similar failures
    ///   where no response was received.
    async fn push(&self, body: Vec<u8>) -> Result<u16, TransportError>;
}

/// A transport that accepts every payload without doing any I/O.
///
/// Useful for measuring the overhead of the adapter itself, and for
/// tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn push(&self, _body: Vec<u8>) -> Result<u16, TransportError> {
        Ok(204)
    }
}

#[cfg(feature = "http")]
pub use self::http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::{Transport, TransportError};
    use crate::config::LokiConfig;
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use reqwest::Client;
    use std::time::Duration;

    /// Tenant header understood by multi-tenant Loki deployments.
    pub const TENANT_HEADER: &str = "X-Scope-OrgID";

    /// [`Transport`] backed by a pooled `reqwest` client.
    #[derive(Clone, Debug)]
    pub struct HttpTransport {
        client: Client,
        url: String,
        tenant_id: Option<String>,
    }

    impl HttpTransport {
        /// Construct a transport from the URL, timeout and tenant in `config`.
        ///
        /// **Returns**
        /// - A ready-to-use [`HttpTransport`].
        /// - `Err(TransportError::Client)` if the TLS backend or client
        ///   could not be initialised.
        pub fn new(config: &LokiConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(config.timeout)
                .pool_max_idle_per_host(100)
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .map_err(|e| TransportError::Client(Box::new(e)))?;

            Ok(Self {
                client,
                url: config.url.clone(),
                tenant_id: config.tenant_id.clone(),
            })
        }

        pub fn url(&self) -> &str {
            &self.url
        }

        fn headers(&self) -> HeaderMap {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            if let Some(tenant) = &self.tenant_id {
                match HeaderValue::from_str(tenant) {
                    Ok(value) => {
                        headers.insert(TENANT_HEADER, value);
                    }
                    Err(_) => {
                        tracing::warn!(
                            tenant = %tenant,
                            "tenant id is not a valid header value, omitting"
                        );
                    }
                }
            }
            headers
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn push(&self, body: Vec<u8>) -> Result<u16, TransportError> {
            let resp = self
                .client
                .post(&self.url)
                .headers(self.headers())
                .body(body)
                .send()
                .await
                .map_err(|e| TransportError::Request(Box::new(e)))?;

            Ok(resp.status().as_u16())
        }
    }
}
