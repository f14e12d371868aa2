//! Shared test harness: a mock non-blocking writer with a bounded,
//! drainable send buffer, and a mock request.

#![allow(dead_code)]

use async_trait::async_trait;
use http::StatusCode;
use swiftfile::{AbortSignal, Request, ResponseWriter};

/// Route handler tracing into the test output. Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Mock request built from a URL and a header list.
pub struct MockRequest {
    url: String,
    headers: Vec<(String, String)>,
}

impl MockRequest {
    pub fn new(url: &str) -> Self {
        MockRequest {
            url: url.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_lowercase(), value.to_string()));
        self
    }
}

impl Request for MockRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

/// Mock writer that accepts body bytes up to a configurable send-buffer
/// capacity and "transmits" (drains) the buffer on every `writable()`
/// await. All accepted body bytes are recorded in order in `wire`.
pub struct MockWriter {
    /// Send-buffer capacity in bytes; `usize::MAX` means never saturated.
    capacity: usize,
    /// Bytes currently sitting in the simulated send buffer.
    buffered: usize,
    /// Every status line written (exactly one expected per request).
    pub statuses: Vec<StatusCode>,
    pub headers: Vec<(String, String)>,
    /// Body bytes accepted, in acceptance order.
    pub wire: Vec<u8>,
    offset: u64,
    pub ended: bool,
    /// The byte total last passed to `try_end`.
    pub announced_total: Option<u64>,
    pub writable_waits: usize,
    /// Fire the abort signal once `writable_waits` reaches this count.
    pub abort_after_waits: Option<usize>,
    corked: bool,
    pub corked_header_writes: usize,
    abort: AbortSignal,
}

impl MockWriter {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MockWriter {
            capacity,
            buffered: 0,
            statuses: Vec::new(),
            headers: Vec::new(),
            wire: Vec::new(),
            offset: 0,
            ended: false,
            announced_total: None,
            writable_waits: 0,
            abort_after_waits: None,
            corked: false,
            corked_header_writes: 0,
            abort: AbortSignal::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn status(&self) -> Option<StatusCode> {
        assert!(
            self.statuses.len() <= 1,
            "more than one status line written: {:?}",
            self.statuses
        );
        self.statuses.first().copied()
    }

    fn room(&self) -> usize {
        self.capacity.saturating_sub(self.buffered)
    }
}

#[async_trait]
impl ResponseWriter for MockWriter {
    fn write_status(&mut self, status: StatusCode) {
        self.statuses.push(status);
    }

    fn write_header(&mut self, name: &str, value: &str) {
        if self.corked {
            self.corked_header_writes += 1;
        }
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, chunk: &[u8]) -> bool {
        self.wire.extend_from_slice(chunk);
        self.buffered += chunk.len();
        self.offset += chunk.len() as u64;
        self.buffered <= self.capacity
    }

    fn try_end(&mut self, chunk: &[u8], total: u64) -> (bool, bool) {
        self.announced_total = Some(total);
        let accept = chunk.len().min(self.room());
        self.wire.extend_from_slice(&chunk[..accept]);
        self.buffered += accept;
        self.offset += accept as u64;
        let ok = accept == chunk.len();
        let done = self.offset == total;
        if done {
            self.ended = true;
        }
        (ok, done)
    }

    fn end(&mut self, body: &[u8]) {
        self.wire.extend_from_slice(body);
        self.offset += body.len() as u64;
        self.ended = true;
    }

    fn write_offset(&self) -> u64 {
        self.offset
    }

    async fn writable(&mut self) -> u64 {
        self.writable_waits += 1;
        if let Some(limit) = self.abort_after_waits {
            if self.writable_waits >= limit {
                self.abort.abort();
            }
        }
        // the simulated network drains the whole send buffer
        self.buffered = 0;
        self.offset
    }

    fn cork(&mut self, f: &mut dyn FnMut(&mut Self)) {
        self.corked = true;
        f(self);
        self.corked = false;
    }

    fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }
}
