//! Stream driver: the network read loop
//!
//! One [`StreamDriver::run`] call performs one HTTP exchange and pushes the
//! body through a fresh [`LineSplitter`], the line parser and the given
//! adapter, reporting to a [`StreamSink`]. Per-line failures are absorbed;
//! transport failures end the stream through `on_error`; cancellation ends
//! it through `on_complete`.

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ChatStreamError, Result};

use super::{
    streaming::{parse_line, LineSplitter, ParseOptions},
    transport::{ByteStream, HttpTransport, ReqwestTransport, StreamRequest},
    CanonicalEvent, StreamAdapter,
};

/// Default ceiling on a single unterminated line (16 MiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Receives the output of one stream
///
/// Callbacks run synchronously inside the read loop; slow handlers delay
/// the stream.
pub trait StreamSink {
    /// One canonical event
    fn on_event(&mut self, event: CanonicalEvent);

    /// Body exhausted, or the stream was cancelled
    fn on_complete(&mut self);

    /// Transport-level failure; no further callbacks follow
    fn on_error(&mut self, error: ChatStreamError);
}

/// Sink built from three closures
pub struct FnSink<E, C, F> {
    on_event: E,
    on_complete: C,
    on_error: F,
}

impl<E, C, F> FnSink<E, C, F>
where
    E: FnMut(CanonicalEvent),
    C: FnMut(),
    F: FnMut(ChatStreamError),
{
    /// Create a sink from `on_event`, `on_complete` and `on_error`
    pub fn new(on_event: E, on_complete: C, on_error: F) -> Self {
        Self {
            on_event,
            on_complete,
            on_error,
        }
    }
}

impl<E, C, F> StreamSink for FnSink<E, C, F>
where
    E: FnMut(CanonicalEvent),
    C: FnMut(),
    F: FnMut(ChatStreamError),
{
    fn on_event(&mut self, event: CanonicalEvent) {
        (self.on_event)(event);
    }

    fn on_complete(&mut self) {
        (self.on_complete)();
    }

    fn on_error(&mut self, error: ChatStreamError) {
        (self.on_error)(error);
    }
}

/// Sink that records everything it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<CanonicalEvent>,
    pub completed: bool,
    pub error: Option<ChatStreamError>,
}

impl StreamSink for RecordingSink {
    fn on_event(&mut self, event: CanonicalEvent) {
        self.events.push(event);
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }

    fn on_error(&mut self, error: ChatStreamError) {
        self.error = Some(error);
    }
}

/// How a [`StreamDriver::run`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Body exhausted; `on_complete` was called
    Completed,
    /// Cancellation observed; `on_complete` was called
    Cancelled,
    /// Transport failure; `on_error` was called
    Failed,
}

/// Driver settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Line parser settings, including decode limits
    pub parse: ParseOptions,

    /// Ceiling on the retained unterminated line
    pub max_line_bytes: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Result of waiting for the next body chunk
enum Read {
    Chunk(Bytes),
    End,
    Cancelled,
    Failed(ChatStreamError),
}

/// How the read loop stopped, when it did not fail
enum DriveEnd {
    Finished,
    Cancelled,
}

/// Runs streaming exchanges over an [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct StreamDriver<T = ReqwestTransport> {
    transport: T,
    options: DriverOptions,
}

impl<T: HttpTransport> StreamDriver<T> {
    /// Create a driver with default options
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, DriverOptions::default())
    }

    /// Create a driver with explicit options
    pub fn with_options(transport: T, options: DriverOptions) -> Self {
        Self { transport, options }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Driver settings
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Perform one exchange, feeding events to `sink` until the body ends,
    /// a transport error occurs, or `cancel` fires
    ///
    /// Exactly one of `on_complete` or `on_error` is called.
    pub async fn run<A, S>(
        &self,
        request: &StreamRequest,
        adapter: &mut A,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> StreamOutcome
    where
        A: StreamAdapter + ?Sized,
        S: StreamSink + ?Sized,
    {
        debug!(url = %request.url, "Opening stream");

        match self.drive(request, adapter, sink, cancel).await {
            Ok(DriveEnd::Finished) => {
                debug!(url = %request.url, "Stream completed");
                sink.on_complete();
                StreamOutcome::Completed
            }
            Ok(DriveEnd::Cancelled) => {
                debug!(url = %request.url, "Stream cancelled");
                sink.on_complete();
                StreamOutcome::Cancelled
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Stream failed");
                sink.on_error(e);
                StreamOutcome::Failed
            }
        }
    }

    async fn drive<A, S>(
        &self,
        request: &StreamRequest,
        adapter: &mut A,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<DriveEnd>
    where
        A: StreamAdapter + ?Sized,
        S: StreamSink + ?Sized,
    {
        if cancel.is_cancelled() {
            return Ok(DriveEnd::Cancelled);
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(DriveEnd::Cancelled),
            response = self.transport.send(request) => response?,
        };

        if cancel.is_cancelled() {
            return Ok(DriveEnd::Cancelled);
        }

        if !response.is_success() {
            let body = match response.body {
                Some(mut body) => match read_to_string(&mut body, cancel).await? {
                    Some(text) => text,
                    None => return Ok(DriveEnd::Cancelled),
                },
                None => String::new(),
            };
            return Err(ChatStreamError::Status {
                status: response.status,
                body,
            });
        }

        let mut body = response.body.ok_or(ChatStreamError::MissingBody)?;
        let options = &self.options.parse;
        let mut splitter = LineSplitter::new();

        loop {
            match next_chunk(&mut body, cancel).await {
                Read::Chunk(bytes) => {
                    splitter.feed_bytes(&bytes, |line| {
                        dispatch_line(line, options, &mut *adapter, &mut *sink);
                    });

                    if splitter.buffered_len() > self.options.max_line_bytes {
                        splitter.reset();
                        return Err(ChatStreamError::LineTooLong {
                            limit: self.options.max_line_bytes,
                        });
                    }
                }
                Read::End => break,
                Read::Cancelled => {
                    splitter.reset();
                    return Ok(DriveEnd::Cancelled);
                }
                Read::Failed(e) => return Err(e),
            }
        }

        splitter.finish(|line| dispatch_line(line, options, &mut *adapter, &mut *sink));
        for event in adapter.finish() {
            sink.on_event(event);
        }

        Ok(DriveEnd::Finished)
    }
}

/// Parse one line and forward whatever the adapter makes of it
fn dispatch_line<A, S>(line: &str, options: &ParseOptions, adapter: &mut A, sink: &mut S)
where
    A: StreamAdapter + ?Sized,
    S: StreamSink + ?Sized,
{
    if let Some(frame) = parse_line(line, options) {
        for event in adapter.apply(&frame) {
            sink.on_event(event);
        }
    }
}

/// Wait for the next chunk, checking `cancel` before and after suspending
async fn next_chunk(body: &mut ByteStream, cancel: &CancellationToken) -> Read {
    if cancel.is_cancelled() {
        return Read::Cancelled;
    }

    let chunk = tokio::select! {
        biased;
        () = cancel.cancelled() => return Read::Cancelled,
        chunk = body.next() => chunk,
    };

    if cancel.is_cancelled() {
        return Read::Cancelled;
    }

    match chunk {
        Some(Ok(bytes)) => Read::Chunk(bytes),
        Some(Err(e)) => Read::Failed(e),
        None => Read::End,
    }
}

/// Read a whole (error) body; `None` if cancelled first
async fn read_to_string(
    body: &mut ByteStream,
    cancel: &CancellationToken,
) -> Result<Option<String>> {
    let mut bytes = Vec::new();
    loop {
        match next_chunk(body, cancel).await {
            Read::Chunk(chunk) => bytes.extend_from_slice(&chunk),
            Read::End => return Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Read::Cancelled => return Ok(None),
            Read::Failed(e) => return Err(e),
        }
    }
}
