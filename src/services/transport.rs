//! HTTP transport for streaming requests
//!
//! The [`StreamDriver`](super::driver::StreamDriver) talks to the network
//! only through [`HttpTransport`], so tests can script responses without a
//! server (see [`MockTransport`](super::mock::MockTransport)).

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client, Method, StatusCode,
};
use serde_json::Value;

use crate::error::{ChatStreamError, Result};

/// Response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Headers whose values are never printed
const SECRET_HEADERS: [&str; 3] = ["authorization", "x-api-key", "x-goog-api-key"];

/// Outbound streaming request
#[derive(Clone)]
pub struct StreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl StreamRequest {
    /// Create a POST request to `url`
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of the first header matching `name`, case-insensitively
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers converted for reqwest
    ///
    /// # Errors
    ///
    /// Returns an error if a header name or value is not valid HTTP
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ChatStreamError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ChatStreamError::InvalidHeader(name.to_string()))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

impl fmt::Debug for StreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if SECRET_HEADERS.iter().any(|s| name.eq_ignore_ascii_case(s)) {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("StreamRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .finish()
    }
}

/// Status and body of a response, before any streaming
pub struct TransportResponse {
    pub status: u16,

    /// `None` when the response carries no body at all
    pub body: Option<ByteStream>,
}

impl TransportResponse {
    /// Check if status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one HTTP exchange and hands back the streaming body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request; resolves once headers arrive
    async fn send(&self, request: &StreamRequest) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with default client settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        Self::with_proxy(None)
    }

    /// Create a transport routing all traffic through `proxy`
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is invalid or the client cannot be
    /// built
    pub fn with_proxy(proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &StreamRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(ACCEPT, "text/event-stream")
            .headers(request.header_map()?);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        let body: Option<ByteStream> = if status == StatusCode::NO_CONTENT {
            None
        } else {
            Some(Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(ChatStreamError::from)),
            ))
        };

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
