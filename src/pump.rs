//! Range and stream pump
//!
//! Streams a file (or a byte range of it) to the non-blocking writer
//! under backpressure. Two data strategies exist:
//!
//! - **known total**: the body length is the range length, so chunks go
//!   out through `try_end`. When the send buffer fills mid-chunk the pump
//!   waits for a writable notification and retries the untransmitted
//!   suffix, computed from the writer's cumulative offset.
//! - **unknown total**: a streaming compressor sits between the file and
//!   the writer, so the final length is unknown until the compressor
//!   flushes. Chunks go out through `write`; a `false` return pauses the
//!   read until the writer drains.
//!
//! The file handle is owned by the pump and released on every exit path.
//! Once headers are committed no error can produce a second status line;
//! failures after that point terminate the response silently.

use crate::config::ServeConfig;
use crate::emitter::format_etag;
use crate::encoding::StreamCompressor;
use crate::error::{Result, ServeError};
use crate::io::ResponseWriter;
use crate::models::{ByteRange, ContentCoding, RequestState};
use http::StatusCode;
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::{debug, error};

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `file` to the writer, driven either by a `Range` header or by
/// the reader's size gate.
///
/// A compressor is interposed only on the size-gate path (`coding` is
/// ignored for range-driven requests, which always serve raw bytes). The
/// only error returned after argument validation is
/// [`ServeError::Aborted`]; everything else that can fail mid-stream is
/// resolved internally because the headers are already on the wire.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn pump<W: ResponseWriter>(
    res: &mut W,
    config: &ServeConfig,
    state: &RequestState,
    file: File,
    size: u64,
    mtime: SystemTime,
    coding: ContentCoding,
    media_type: Option<String>,
) -> Result<()> {
    let range_driven = !state.range.is_empty();
    let range = if range_driven {
        ByteRange::parse(&state.range, size)?
    } else {
        ByteRange {
            start: 0,
            end: size.saturating_sub(1),
        }
    };

    let compressor = if range_driven {
        None
    } else {
        StreamCompressor::new(coding)
    };
    let compressed = compressor.is_some();

    debug!(
        start = range.start,
        end = range.end,
        size,
        range_driven,
        compressed,
        "pumping stream"
    );

    res.cork(&mut |res| {
        if range_driven {
            res.write_status(StatusCode::PARTIAL_CONTENT);
        } else {
            res.write_status(StatusCode::OK);
            res.write_header("Accept-Ranges", "bytes");
        }
        res.write_header("Connection", "keep-alive");
        if config.last_modified {
            res.write_header("Last-Modified", &httpdate::fmt_http_date(mtime));
        }
        if config.etag {
            res.write_header("ETag", &format_etag(mtime, size, compressed));
        }
        if compressed {
            if let Some(token) = coding.token() {
                res.write_header("Content-Encoding", token);
            }
        }
        if range_driven {
            res.write_header("Content-Range", &range.content_range(size));
        }
        if let Some(media_type) = &media_type {
            res.write_header("Content-Type", media_type);
        }
    });

    // Headers are committed from here on: no second status line.
    let mut file = file;
    if range.start > 0 {
        if let Err(e) = file.seek(SeekFrom::Start(range.start)).await {
            error!(error = %e, "seek failed after headers");
            res.end(&[]);
            return Ok(());
        }
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }
    }

    match compressor {
        Some(compressor) => pump_compressed(res, state, file, range.total(), compressor).await,
        None => pump_known_total(res, state, file, range.total()).await,
    }
}

/// Known-total strategy: `try_end` with suffix retries on backpressure.
async fn pump_known_total<W: ResponseWriter>(
    res: &mut W,
    state: &RequestState,
    mut file: File,
    total: u64,
) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = total;
    let mut done = false;

    'read: while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = match file.read(&mut buf[..want]).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "read failed after headers");
                break 'read;
            }
        };
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }
        if n == 0 {
            // file ended short of the requested range
            break 'read;
        }
        remaining -= n as u64;

        let chunk = &buf[..n];
        let mut last_offset = res.write_offset();
        let (ok, finished) = res.try_end(chunk, total);
        if finished {
            done = true;
            break 'read;
        }
        if ok {
            continue 'read;
        }

        // The send buffer filled mid-chunk. Wait for space and retry the
        // suffix that is still untransmitted; the writable offset is
        // cumulative, so the suffix starts at offset - last_offset into
        // the pending bytes.
        let mut pending = chunk;
        loop {
            let offset = res.writable().await;
            if state.is_aborted() {
                return Err(ServeError::Aborted);
            }
            let consumed = ((offset - last_offset) as usize).min(pending.len());
            let (ok, finished) = res.try_end(&pending[consumed..], total);
            if finished {
                done = true;
                break 'read;
            }
            if ok {
                continue 'read;
            }
            // the retry was partial too: rebase the pending suffix onto
            // everything the writer has accepted so far
            let accepted = ((res.write_offset() - last_offset) as usize).min(pending.len());
            pending = &pending[accepted..];
            last_offset = res.write_offset();
        }
    }

    if !done && !state.is_aborted() {
        // close path: the transfer fell short, terminate the response
        res.end(&[]);
    }
    Ok(())
}

/// Unknown-total strategy: compressed chunks through `write`, pausing
/// once per saturated buffer.
async fn pump_compressed<W: ResponseWriter>(
    res: &mut W,
    state: &RequestState,
    mut file: File,
    total: u64,
    mut compressor: StreamCompressor,
) -> Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = total;

    while remaining > 0 {
        let want = buf.len().min(remaining as usize);
        let n = match file.read(&mut buf[..want]).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "read failed after headers");
                res.end(&[]);
                return Ok(());
            }
        };
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }
        if n == 0 {
            break;
        }
        remaining -= n as u64;

        let out = match compressor.push(&buf[..n]) {
            Ok(out) => out,
            Err(e) => {
                error!(error = %e, "compressor failed after headers");
                res.end(&[]);
                return Ok(());
            }
        };
        if !out.is_empty() && !res.write(&out) {
            res.writable().await;
            if state.is_aborted() {
                return Err(ServeError::Aborted);
            }
        }
    }

    match compressor.finish() {
        Ok(tail) => res.end(&tail),
        Err(e) => {
            error!(error = %e, "compressor finish failed");
            res.end(&[]);
        }
    }
    Ok(())
}
