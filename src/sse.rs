//! Server-sent events over a byte stream.
//!
//! Only the `data` field matters here. Multi-line data is joined with
//! `\n`, comments and other fields are skipped, and a trailing event
//! without a terminating blank line is still emitted at end of stream.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Yields the `data` payload of each event in the underlying byte stream.
#[derive(Debug)]
pub struct SseEvents<S> {
    inner: S,
    buffer: Vec<u8>,
    data: Vec<String>,
    finished: bool,
}

impl<S> SseEvents<S> {
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            data: Vec::new(),
            finished: false,
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim_end_matches(['\n', '\r']).to_string())
    }

    /// Feeds one line into the pending event, returning the event when the
    /// line terminates it.
    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

impl<S, E> Stream for SseEvents<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<String, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.next_line() {
                if let Some(event) = self.process_line(&line) {
                    return Poll::Ready(Some(Ok(event)));
                }
                continue;
            }

            if self.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => self.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    self.finished = true;
                    // unterminated last line
                    if !self.buffer.is_empty() {
                        let rest = std::mem::take(&mut self.buffer);
                        let line = String::from_utf8_lossy(&rest).trim_end_matches('\r').to_string();
                        self.process_line(&line);
                    }
                    return Poll::Ready(self.take_event().map(Ok));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
