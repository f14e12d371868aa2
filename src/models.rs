//! Core data models for the serving pipeline

use crate::error::{Result, ServeError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Cancellation flag shared between the embedding response and the
/// in-flight handler invocation.
///
/// The embedding server flips the flag when the client disconnects; the
/// pipeline polls it after every suspension point and discards its work
/// once it is set. Cloning is cheap and all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Create a new, un-aborted signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the request as aborted.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the request has been aborted.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Content coding applied to a response body.
///
/// `Identity` means no transformation; on the wire it shows up as the
/// absence of a `Content-Encoding` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
    #[serde(rename = "br")]
    Brotli,
}

impl ContentCoding {
    /// Number of distinct codings; also the artifact cache shard count.
    pub const COUNT: usize = 4;

    /// The `Content-Encoding` token, or `None` for identity.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            ContentCoding::Identity => None,
            ContentCoding::Gzip => Some("gzip"),
            ContentCoding::Deflate => Some("deflate"),
            ContentCoding::Brotli => Some("br"),
        }
    }

    /// Parse an `Accept-Encoding` token into a coding.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "identity" => Some(ContentCoding::Identity),
            "gzip" => Some(ContentCoding::Gzip),
            "deflate" => Some(ContentCoding::Deflate),
            "br" => Some(ContentCoding::Brotli),
            _ => None,
        }
    }

    /// Index of the cache shard holding artifacts in this coding.
    pub fn shard(&self) -> usize {
        match self {
            ContentCoding::Identity => 0,
            ContentCoding::Gzip => 1,
            ContentCoding::Deflate => 2,
            ContentCoding::Brotli => 3,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ContentCoding::Identity)
    }
}

/// Per-request state, owned by a single handler invocation.
#[derive(Debug, Clone)]
pub struct RequestState {
    /// Decoded URL path, percent-decoded, leading slash intact, with the
    /// configured `base` prefix already stripped.
    pub url: String,
    /// Lowercased extension without the dot; empty when the URL has none.
    pub ext: String,
    /// Raw `Accept` header.
    pub accept: String,
    /// Raw `Accept-Encoding` header.
    pub accept_encoding: String,
    /// Raw `Range` header, empty when absent.
    pub range: String,
    /// Abort flag shared with the embedding response.
    pub abort: AbortSignal,
}

impl RequestState {
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// A fully materialized response body with its metadata, cacheable by
/// `(path, encoding)`.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Absolute filesystem path; cache key component.
    pub path: String,
    /// Last-modified time of the file at materialization.
    pub mtime: SystemTime,
    /// Response body, already encoded when `encoding` is not identity.
    pub bytes: Bytes,
    /// Coding the body is stored in; equals the shard it is cached under.
    pub encoding: ContentCoding,
    /// Media type, when the extension resolved to one.
    pub media_type: Option<String>,
}

/// An inclusive byte range over a resource of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// Starting byte position (inclusive)
    pub start: u64,
    /// Ending byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by this range.
    pub fn total(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse a `Range` header against a resource of `size` bytes.
    ///
    /// This deliberately mirrors the wire behavior of the serving engine
    /// this crate descends from, quirks included:
    ///
    /// - the value is assumed to start with `bytes=`; the parser slices
    ///   past the first six characters unconditionally and takes the
    ///   integers around the first `-`. Multi-range values and embedded
    ///   whitespace are not understood;
    /// - a missing, malformed, **or zero** end position falls back to
    ///   `size - 1` (so `bytes=0-0` serves through end of file);
    /// - a missing start position falls back to `size - end - 1`
    ///   (`bytes=-` therefore resolves to the whole file).
    ///
    /// # Returns
    /// * `Ok(ByteRange)` for a satisfiable range
    /// * `Err(ServeError::NotSatisfiable)` when the range ends at or past
    ///   `size`, or is inverted
    pub fn parse(header: &str, size: u64) -> Result<Self> {
        let value = header.get(6..).unwrap_or("");
        let (start_part, end_part) = match value.split_once('-') {
            Some(parts) => parts,
            None => (value, ""),
        };

        let end = match end_part.parse::<u64>() {
            Ok(0) | Err(_) => size.saturating_sub(1),
            Ok(end) => end,
        };
        let start = match start_part.parse::<u64>() {
            Ok(start) => start,
            Err(_) => (size.saturating_sub(end)).saturating_sub(1),
        };

        if end >= size || start > end {
            return Err(ServeError::NotSatisfiable { size });
        }
        Ok(ByteRange { start, end })
    }

    /// `Content-Range` value for a successful partial response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}
