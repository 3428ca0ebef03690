//! Incremental line splitting for chunked event streams
//!
//! A provider may flush at any byte offset: mid-line, mid-JSON, mid-escape,
//! or in the middle of a multi-byte character. The splitter only
//! reassembles lines; payload well-formedness is checked downstream.

use std::borrow::Cow;

/// Buffers the unterminated tail of a stream and emits complete lines
#[derive(Debug, Default)]
pub struct LineSplitter {
    /// Text after the last line feed seen so far
    buffer: String,

    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,

    /// Total bytes searched for line feeds
    #[cfg(test)]
    scanned: usize,
}

impl LineSplitter {
    /// Create an empty splitter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text chunk and emit every complete line in order
    ///
    /// The final fragment is always kept as the new buffer, even when it is
    /// empty because the chunk ended exactly on a line feed. A trailing
    /// carriage return is stripped from each emitted line. Only the new
    /// chunk is searched: the retained tail never holds a line feed.
    pub fn feed<F>(&mut self, chunk: &str, mut sink: F)
    where
        F: FnMut(&str),
    {
        let old_len = self.buffer.len();
        self.buffer.push_str(chunk);

        let mut start = 0;
        let mut search_from = old_len;
        while let Some(offset) = self.buffer[search_from..].find('\n') {
            let end = search_from + offset;
            let line = &self.buffer[start..end];
            sink(line.strip_suffix('\r').unwrap_or(line));
            start = end + 1;
            search_from = start;
        }

        #[cfg(test)]
        {
            self.scanned += self.buffer.len() - old_len;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
    }

    /// Append raw bytes, carrying an incomplete UTF-8 sequence over to the
    /// next call
    ///
    /// Bytes that can never form valid UTF-8 are replaced with U+FFFD.
    pub fn feed_bytes<F>(&mut self, bytes: &[u8], sink: F)
    where
        F: FnMut(&str),
    {
        self.pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                    }
                }
            }
        }

        self.feed(&text, sink);
    }

    /// Emit the unterminated tail as a final line, if there is one
    ///
    /// Called at end of body for servers that omit the last line feed.
    pub fn finish<F>(&mut self, mut sink: F)
    where
        F: FnMut(&str),
    {
        if !self.pending.is_empty() {
            let tail: Cow<'_, str> = String::from_utf8_lossy(&self.pending);
            self.buffer.push_str(&tail);
            self.pending.clear();
        }

        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            sink(line.strip_suffix('\r').unwrap_or(line.as_str()));
        }
    }

    /// Drop any buffered partial line without interpreting it
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending.clear();
    }

    /// Size in bytes of the retained partial line
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }
}
