//! Scripted transport for testing
//!
//! [`MockTransport`] is a queue-based fake: each call to
//! [`send`](HttpTransport::send) pops the next [`MockResponse`] and records
//! the request for later assertion. Bodies are delivered as the exact chunks
//! queued, so tests control chunk boundaries precisely.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use crate::error::{ChatStreamError, Result};

use super::transport::{ByteStream, HttpTransport, StreamRequest, TransportResponse};

/// What happens after the queued chunks are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyEnd {
    /// Body ends normally
    Close,
    /// Body never yields again
    Hang,
    /// Body read fails with this message
    Fail(String),
}

/// One scripted response
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    chunks: Option<Vec<Bytes>>,
    end: BodyEnd,
    never_responds: bool,
}

impl MockResponse {
    /// 200 response streaming `chunks` in order
    #[must_use]
    pub fn sse<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            status: 200,
            chunks: Some(chunks.into_iter().map(Into::into).collect()),
            end: BodyEnd::Close,
            never_responds: false,
        }
    }

    /// Response with `status` and a single-chunk body
    #[must_use]
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            ..Self::sse([body.into()])
        }
    }

    /// Response with `status` and no body at all
    #[must_use]
    pub fn no_body(status: u16) -> Self {
        Self {
            status,
            chunks: None,
            end: BodyEnd::Close,
            never_responds: false,
        }
    }

    /// Request whose headers never arrive
    #[must_use]
    pub fn never() -> Self {
        Self {
            never_responds: true,
            ..Self::no_body(200)
        }
    }

    /// Keep the body open forever after the queued chunks
    #[must_use]
    pub fn then_hang(mut self) -> Self {
        self.end = BodyEnd::Hang;
        self
    }

    /// Fail the body read after the queued chunks
    #[must_use]
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.end = BodyEnd::Fail(message.into());
        self
    }

    fn into_response(self) -> TransportResponse {
        let body = self.chunks.map(|chunks| {
            let chunks = stream::iter(chunks.into_iter().map(Ok));
            let body: ByteStream = match self.end {
                BodyEnd::Close => Box::pin(chunks),
                BodyEnd::Hang => Box::pin(chunks.chain(stream::pending())),
                BodyEnd::Fail(message) => Box::pin(
                    chunks.chain(stream::once(async move {
                        Err(ChatStreamError::Transport(message))
                    })),
                ),
            };
            body
        });

        TransportResponse {
            status: self.status,
            body,
        }
    }
}

/// Queue-based transport that never touches the network
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<StreamRequest>>>,
}

impl MockTransport {
    /// Create an empty transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport with one queued response
    #[must_use]
    pub fn with_response(response: MockResponse) -> Self {
        let transport = Self::new();
        transport.queue(response);
        transport
    }

    /// Queue a response for the next `send`
    pub fn queue(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Requests sent so far
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &StreamRequest) -> Result<TransportResponse> {
        self.requests.lock().push(request.clone());

        let response = self
            .responses
            .lock()
            .pop_front()
            .ok_or_else(|| ChatStreamError::Transport("no mock response queued".to_string()))?;

        if response.never_responds {
            futures::future::pending::<()>().await;
        }

        Ok(response.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_chunks_and_records_requests() {
        let transport = MockTransport::with_response(MockResponse::sse(["a", "b"]));
        let request = StreamRequest::post("http://mock/chat");

        let response = transport.send(&request).await.unwrap();
        assert!(response.is_success());

        let chunks: Vec<Bytes> = response
            .body
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b")]);
        assert_eq!(transport.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_is_an_error() {
        let transport = MockTransport::new();
        let result = transport.send(&StreamRequest::post("http://mock")).await;
        assert!(matches!(result, Err(ChatStreamError::Transport(_))));
    }

    #[tokio::test]
    async fn test_then_fail_appends_error() {
        let transport =
            MockTransport::with_response(MockResponse::sse(["x"]).then_fail("reset by peer"));
        let mut body = transport
            .send(&StreamRequest::post("http://mock"))
            .await
            .unwrap()
            .body
            .unwrap();

        assert!(body.next().await.unwrap().is_ok());
        assert!(matches!(
            body.next().await,
            Some(Err(ChatStreamError::Transport(_)))
        ));
        assert!(body.next().await.is_none());
    }
}
