//! swiftfile: static-file HTTP serving core
//!
//! A high-throughput request handler that maps URL paths to files under a
//! configured root and writes them back to a non-blocking HTTP response,
//! with content negotiation for compression, in-memory caching of
//! compressed artifacts, byte-range requests and streaming under explicit
//! backpressure.
//!
//! The crate is transport-agnostic: the embedding HTTP server supplies a
//! [`Request`] view and a [`ResponseWriter`] over its bounded send
//! buffer, and the handler drives everything through those traits. TLS,
//! sockets, request parsing and worker spawning stay outside.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use swiftfile::{ServeConfig, StaticFiles};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServeConfig {
//!     min_compress_size: 1280,
//!     ..Default::default()
//! };
//! let handler = StaticFiles::new("/srv/www", config)?;
//!
//! // inside the embedding server's request callback:
//! // handler.serve(&mut res, &req).await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`StaticFiles`]: handler instance owning configuration and caches,
//!   one per worker
//! - [`ServeConfig`]: thresholds, compression preference and index mode
//! - `path`: URL → contained absolute path, plus index resolution
//! - `encoding`: `Accept-Encoding` negotiation and the gzip / deflate /
//!   brotli compressors
//! - `cache`: per-encoding artifact shards and the index memo
//! - `reader`: whole-file materialization (transform → compress → cache)
//! - `pump`: byte-range parsing and the backpressure-aware stream loop
//! - `emitter`: corked header/body emission and the error pages
//!
//! # Concurrency model
//!
//! A handler instance is shared immutably across in-flight requests;
//! per-request state lives in the invocation. Caches are internally
//! locked with read-mostly maps, so a handler can serve from many tasks,
//! or deployments can pin one instance per worker and share nothing.
//!
//! Client disconnects flip the per-response [`AbortSignal`]; the pipeline
//! re-checks it after every suspension point and releases file handles on
//! all exit paths.

pub mod cache;
pub mod config;
pub mod emitter;
pub mod encoding;
pub mod error;
pub mod handler;
pub mod io;
pub mod mime;
pub mod models;
pub mod path;
mod pump;
mod reader;

pub use cache::{ArtifactCache, CacheStats, IndexMemo};
pub use config::{IndexMode, ServeConfig};
pub use emitter::format_etag;
pub use encoding::{negotiate, parse_accept_encoding, AcceptedEncoding, StreamCompressor};
pub use error::{Result, ServeError};
pub use handler::{ErrorPages, IndexResolver, StaticFiles, Transform};
pub use io::{Request, ResponseWriter};
pub use models::{AbortSignal, Artifact, ByteRange, ContentCoding, RequestState};
pub use path::IndexOutcome;
