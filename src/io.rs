//! Embedding interfaces: the request and non-blocking response writer
//!
//! The serving core is transport-agnostic. The embedding HTTP server
//! supplies a [`Request`] view over the parsed request and a
//! [`ResponseWriter`] over its non-blocking send path; everything the
//! pipeline does flows through these two traits.

use crate::models::AbortSignal;
use async_trait::async_trait;
use http::StatusCode;

/// Read access to the parsed request.
pub trait Request {
    /// The request-target path, still carrying the configured `base`
    /// prefix and percent-encoding.
    fn url(&self) -> &str;

    /// A header value by lowercase name, or the empty string when the
    /// header is absent.
    fn header(&self, name: &str) -> &str;
}

/// A non-blocking HTTP response writer with a bounded send buffer.
///
/// The contract mirrors a pipelined, event-driven transport:
///
/// - [`try_end`](Self::try_end) appends as much of the chunk as fits and
///   finalizes the response once `total` bytes have been delivered. It
///   returns `(ok, done)`: `ok` means the whole chunk was accepted,
///   `done` means the response is complete. `!ok` means the send buffer
///   filled mid-chunk; the writer keeps whatever prefix it accepted.
/// - [`write_offset`](Self::write_offset) is the cumulative count of body
///   bytes the writer has accepted. After a partial `try_end` the caller
///   uses it to compute which suffix of the chunk is still untransmitted.
/// - [`writable`](Self::writable) resolves when buffer space frees,
///   yielding the current write offset. This is the awaitable form of a
///   writable-notification callback.
/// - [`write`](Self::write) buffers a chunk without a byte total (used
///   when a streaming compressor makes the final length unknowable) and
///   returns `false` when the buffer is saturated.
/// - [`cork`](Self::cork) batches the status line and headers so no
///   partial header emission is observable.
///
/// Implementations are expected to flip the [`AbortSignal`] when the
/// client disconnects; the pipeline polls it at every suspension point
/// and stops touching the writer once it is set.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Write the status line. Must precede any header or body write.
    fn write_status(&mut self, status: StatusCode);

    /// Write a single response header.
    fn write_header(&mut self, name: &str, value: &str);

    /// Buffer a body chunk without a known total. Returns `false` when
    /// the send buffer is saturated and the caller should pause.
    fn write(&mut self, chunk: &[u8]) -> bool;

    /// Append `chunk` toward a response of exactly `total` body bytes.
    /// Returns `(ok, done)` as described on the trait.
    fn try_end(&mut self, chunk: &[u8], total: u64) -> (bool, bool);

    /// Write the final chunk and close the response.
    fn end(&mut self, body: &[u8]);

    /// Cumulative count of body bytes accepted so far.
    fn write_offset(&self) -> u64;

    /// Resolve once send-buffer space has freed, with the write offset at
    /// that moment.
    async fn writable(&mut self) -> u64;

    /// Run `f` with header writes batched into one transmission unit.
    fn cork(&mut self, f: &mut dyn FnMut(&mut Self))
    where
        Self: Sized;

    /// The abort flag shared with this response.
    fn abort_signal(&self) -> AbortSignal;
}
