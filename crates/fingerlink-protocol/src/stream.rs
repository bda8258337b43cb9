//! Raw byte stream between the host and the sensor.
//!
//! [`ByteStream`] is the narrow interface the packet reader consumes: a
//! handful of non-blocking probes plus deadline-bounded reads. Deadlines are
//! absolute [`Instant`]s so a caller can spread one budget over many reads.
//!
//! [`ChannelStream`] is the implementation used everywhere. Bytes arrive as
//! chunks on an unbounded channel, fed either by the serial port reader
//! thread or directly by tests through a [`StreamFeeder`]. Writes leave
//! through a second channel drained by the port writer thread.
//!
//! ```
//! use fingerlink_protocol::{ByteStream, ChannelStream, Instant};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut stream, endpoint) = ChannelStream::pair();
//! endpoint.feed(vec![0xEFu8, 0x01, 0x42]);
//!
//! let deadline = Instant::now() + Duration::from_millis(100);
//! let bytes = stream.read_exact(2, deadline).await.unwrap();
//! assert_eq!(&bytes[..], &[0xEF, 0x01]);
//! assert_eq!(stream.peek_byte(), Some(0x42));
//! # }
//! ```

#![allow(async_fn_in_trait)]

use bytes::{Buf, Bytes, BytesMut};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio::time::{Instant, timeout_at};
use tracing::trace;

use crate::error::StreamError;

/// Initial capacity of the receive buffer.
///
/// Sized for one full template upload (two 256-byte data packets plus headers).
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Largest amount of data held in the buffer while discarding.
pub const DISCARD_CHUNK: usize = 256;

/// A read that ran out of time before `expected` bytes arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRead {
    pub expected: usize,
    pub received: usize,
}

/// Byte-level access to the sensor link.
///
/// Only one scan/read sequence may use a stream at a time; the `&mut self`
/// receivers enforce this at compile time.
pub trait ByteStream: Send {
    /// Number of bytes that can be read without waiting.
    fn available(&mut self) -> usize;

    /// Read one byte if one is already buffered.
    fn try_read_byte(&mut self) -> Option<u8>;

    /// Look at the next buffered byte without consuming it.
    fn peek_byte(&mut self) -> Option<u8>;

    /// Read one byte, waiting until `deadline`.
    ///
    /// Returns `None` if the deadline elapses or the stream closes first.
    async fn read_byte(&mut self, deadline: Instant) -> Option<u8>;

    /// Read exactly `len` bytes, waiting until `deadline`.
    ///
    /// On a short read the partial bytes are consumed and dropped.
    async fn read_exact(&mut self, len: usize, deadline: Instant) -> Result<Bytes, ShortRead>;

    /// Consume and drop exactly `len` bytes, waiting until `deadline`.
    ///
    /// Implementations must not buffer more than a bounded chunk at a time.
    async fn discard(&mut self, len: usize, deadline: Instant) -> Result<(), ShortRead>;

    /// Drop everything currently buffered. Returns the number of bytes dropped.
    fn discard_input(&mut self) -> usize;

    /// Send bytes to the sensor.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), StreamError>;
}

/// Channel-backed [`ByteStream`].
#[derive(Debug)]
pub struct ChannelStream {
    inbound: UnboundedReceiver<Bytes>,
    outbound: UnboundedSender<Bytes>,
    buffer: BytesMut,
    closed: bool,
}

/// The far side of a [`ChannelStream`].
#[derive(Debug)]
pub struct StreamEndpoint {
    feeder: StreamFeeder,
    written: UnboundedReceiver<Bytes>,
}

/// Cloneable handle that pushes received bytes into a [`ChannelStream`].
#[derive(Debug, Clone)]
pub struct StreamFeeder {
    tx: UnboundedSender<Bytes>,
}

impl ChannelStream {
    /// Create a stream and the endpoint that feeds it and collects its writes.
    pub fn pair() -> (Self, StreamEndpoint) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let stream = Self {
            inbound: in_rx,
            outbound: out_tx,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            closed: false,
        };

        let endpoint = StreamEndpoint {
            feeder: StreamFeeder { tx: in_tx },
            written: out_rx,
        };

        (stream, endpoint)
    }

    /// Whether the feeding side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Move every chunk that has already arrived into the buffer.
    fn pump(&mut self) {
        loop {
            match self.inbound.try_recv() {
                Ok(chunk) => self.buffer.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }

    /// Wait until at least `min` bytes are buffered or the deadline passes.
    async fn fill(&mut self, min: usize, deadline: Instant) -> bool {
        loop {
            self.pump();
            if self.buffer.len() >= min {
                return true;
            }
            if self.closed {
                return false;
            }

            match timeout_at(deadline, self.inbound.recv()).await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => self.closed = true,
                Err(_) => return false,
            }
        }
    }
}

impl ByteStream for ChannelStream {
    fn available(&mut self) -> usize {
        self.pump();
        self.buffer.len()
    }

    fn try_read_byte(&mut self) -> Option<u8> {
        self.pump();
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.buffer.get_u8())
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.pump();
        self.buffer.first().copied()
    }

    async fn read_byte(&mut self, deadline: Instant) -> Option<u8> {
        if self.fill(1, deadline).await {
            Some(self.buffer.get_u8())
        } else {
            None
        }
    }

    async fn read_exact(&mut self, len: usize, deadline: Instant) -> Result<Bytes, ShortRead> {
        if self.fill(len, deadline).await {
            return Ok(self.buffer.split_to(len).freeze());
        }

        let received = self.buffer.len().min(len);
        self.buffer.advance(received);
        Err(ShortRead {
            expected: len,
            received,
        })
    }

    async fn discard(&mut self, len: usize, deadline: Instant) -> Result<(), ShortRead> {
        let mut dropped = 0;
        while dropped < len {
            let chunk = (len - dropped).min(DISCARD_CHUNK);
            if !self.fill(chunk, deadline).await {
                let partial = self.buffer.len().min(chunk);
                self.buffer.advance(partial);
                return Err(ShortRead {
                    expected: len,
                    received: dropped + partial,
                });
            }
            self.buffer.advance(chunk);
            dropped += chunk;
        }
        Ok(())
    }

    fn discard_input(&mut self) -> usize {
        self.pump();
        let dropped = self.buffer.len();
        self.buffer.clear();
        if dropped > 0 {
            trace!(dropped, "Discarded stale input");
        }
        dropped
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.outbound
            .send(Bytes::copy_from_slice(bytes))
            .map_err(|_| StreamError::Closed)
    }
}

impl StreamEndpoint {
    /// Push bytes towards the stream. Returns `false` once the stream is gone.
    pub fn feed(&self, bytes: impl Into<Bytes>) -> bool {
        self.feeder.feed(bytes)
    }

    /// Clone of the feeding half.
    pub fn feeder(&self) -> StreamFeeder {
        self.feeder.clone()
    }

    /// Collect everything written to the stream so far.
    pub fn take_written(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = self.written.try_recv() {
            out.extend_from_slice(&chunk);
        }
        out
    }

    /// Wait for the next chunk written to the stream.
    pub async fn next_written(&mut self) -> Option<Bytes> {
        self.written.recv().await
    }

    /// Split into the feeding half and the receiver of written chunks.
    pub fn into_parts(self) -> (StreamFeeder, UnboundedReceiver<Bytes>) {
        (self.feeder, self.written)
    }
}

impl StreamFeeder {
    /// Push bytes towards the stream. Returns `false` once the stream is gone.
    pub fn feed(&self, bytes: impl Into<Bytes>) -> bool {
        self.tx.send(bytes.into()).is_ok()
    }

    /// Whether the stream has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_exact_across_chunks() {
        let (mut stream, endpoint) = ChannelStream::pair();
        endpoint.feed(vec![1u8, 2]);
        endpoint.feed(vec![3u8, 4, 5]);

        let bytes = stream.read_exact(4, deadline_in(10)).await.unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4]);
        assert_eq!(stream.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_exact_waits_for_late_bytes() {
        let (mut stream, endpoint) = ChannelStream::pair();
        let feeder = endpoint.feeder();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            feeder.feed(vec![9u8, 8]);
        });

        let bytes = stream.read_exact(2, deadline_in(100)).await.unwrap();
        assert_eq!(&bytes[..], &[9, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_read_consumes_partial_bytes() {
        let (mut stream, endpoint) = ChannelStream::pair();
        endpoint.feed(vec![1u8, 2, 3]);

        let err = stream.read_exact(5, deadline_in(20)).await.unwrap_err();
        assert_eq!(
            err,
            ShortRead {
                expected: 5,
                received: 3
            }
        );
        assert_eq!(stream.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_spans_chunks() {
        let (mut stream, endpoint) = ChannelStream::pair();
        endpoint.feed(vec![0u8; DISCARD_CHUNK * 2 + 10]);
        endpoint.feed(vec![0x55u8]);

        stream
            .discard(DISCARD_CHUNK * 2 + 10, deadline_in(10))
            .await
            .unwrap();
        assert_eq!(stream.try_read_byte(), Some(0x55));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_short() {
        let (mut stream, endpoint) = ChannelStream::pair();
        endpoint.feed(vec![0u8; 300]);

        let err = stream.discard(400, deadline_in(10)).await.unwrap_err();
        assert_eq!(
            err,
            ShortRead {
                expected: 400,
                received: 300
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_byte_times_out() {
        let (mut stream, _endpoint) = ChannelStream::pair();
        assert_eq!(stream.read_byte(deadline_in(30)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_stream_returns_buffered_then_none() {
        let (mut stream, endpoint) = ChannelStream::pair();
        endpoint.feed(vec![7u8]);
        drop(endpoint);

        assert_eq!(stream.read_byte(deadline_in(10)).await, Some(7));
        assert_eq!(stream.read_byte(deadline_in(10)).await, None);
        assert!(stream.is_closed());
    }

    #[test]
    fn test_non_blocking_probes() {
        let (mut stream, endpoint) = ChannelStream::pair();
        assert_eq!(stream.try_read_byte(), None);
        assert_eq!(stream.peek_byte(), None);

        endpoint.feed(vec![0xAAu8, 0xBB]);
        assert_eq!(stream.available(), 2);
        assert_eq!(stream.peek_byte(), Some(0xAA));
        assert_eq!(stream.try_read_byte(), Some(0xAA));
        assert_eq!(stream.discard_input(), 1);
        assert_eq!(stream.available(), 0);
    }

    #[tokio::test]
    async fn test_writes_reach_endpoint() {
        let (mut stream, mut endpoint) = ChannelStream::pair();
        stream.write_all(&[1, 2, 3]).await.unwrap();
        stream.write_all(&[4]).await.unwrap();

        assert_eq!(endpoint.take_written(), vec![1, 2, 3, 4]);
        assert!(endpoint.take_written().is_empty());
    }

    #[tokio::test]
    async fn test_write_after_endpoint_dropped() {
        let (mut stream, endpoint) = ChannelStream::pair();
        drop(endpoint);
        assert!(matches!(
            stream.write_all(&[1]).await,
            Err(StreamError::Closed)
        ));
    }
}
