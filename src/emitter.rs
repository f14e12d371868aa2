//! Whole-file and error response emission
//!
//! Every response here is written under a single cork: status line,
//! headers and body leave as one batch, so at most one emission is ever
//! observable per request.

use crate::config::ServeConfig;
use crate::io::ResponseWriter;
use crate::models::Artifact;
use http::StatusCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub(crate) const NOT_FOUND_BODY: &str = "Not Found";
pub(crate) const INTERNAL_ERROR_BODY: &str = "Internal Server Error";
pub(crate) const NOT_SATISFIABLE_BODY: &str = "Range Not Satisfiable";

/// Format an entity tag from modification time and size.
///
/// Shape: `[W/]"<hex mtime-seconds>-<hex size>"`. The weak form is used
/// when the body is compressed, since the representation then differs
/// from the stored bytes.
pub fn format_etag(mtime: SystemTime, size: u64, weak: bool) -> String {
    let seconds = mtime
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if weak {
        format!("W/\"{seconds:x}-{size:x}\"")
    } else {
        format!("\"{seconds:x}-{size:x}\"")
    }
}

/// Emit a fully materialized artifact as a complete response.
pub(crate) fn emit_artifact<W: ResponseWriter>(
    res: &mut W,
    config: &ServeConfig,
    artifact: &Artifact,
) {
    let weak = !artifact.encoding.is_identity();
    debug!(
        path = %artifact.path,
        coding = ?artifact.encoding,
        size = artifact.bytes.len(),
        "emitting whole-file response"
    );
    res.cork(&mut |res| {
        res.write_status(StatusCode::OK);
        res.write_header("Connection", "keep-alive");
        if config.last_modified {
            res.write_header("Last-Modified", &httpdate::fmt_http_date(artifact.mtime));
        }
        if config.etag {
            let etag = format_etag(artifact.mtime, artifact.bytes.len() as u64, weak);
            res.write_header("ETag", &etag);
        }
        if let Some(media_type) = &artifact.media_type {
            res.write_header("Content-Type", media_type);
        }
        if let Some(token) = artifact.encoding.token() {
            res.write_header("Content-Encoding", token);
        }
        res.end(&artifact.bytes);
    });
}

/// Emit a `404 Not Found` with the given body.
pub(crate) fn emit_not_found<W: ResponseWriter>(res: &mut W, body: &str) {
    res.cork(&mut |res| {
        res.write_status(StatusCode::NOT_FOUND);
        res.write_header("Connection", "keep-alive");
        res.write_header("Content-Type", "text/plain");
        res.end(body.as_bytes());
    });
}

/// Emit a `500 Internal Server Error`; `detail` carries the error code
/// when one is available.
pub(crate) fn emit_internal_error<W: ResponseWriter>(res: &mut W, body: &str, detail: &str) {
    let body = if detail.is_empty() {
        body.to_string()
    } else {
        format!("{body}: {detail}")
    };
    res.cork(&mut |res| {
        res.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        res.write_header("Connection", "keep-alive");
        res.write_header("Content-Type", "text/plain");
        res.end(body.as_bytes());
    });
}

/// Emit a `416 Range Not Satisfiable` for a resource of `size` bytes.
pub(crate) fn emit_not_satisfiable<W: ResponseWriter>(res: &mut W, size: u64) {
    res.cork(&mut |res| {
        res.write_status(StatusCode::RANGE_NOT_SATISFIABLE);
        res.write_header("Connection", "keep-alive");
        res.write_header(
            "Content-Range",
            &format!("bytes */{}", size.saturating_sub(1)),
        );
        res.end(NOT_SATISFIABLE_BODY.as_bytes());
    });
}

/// Emit a `301 Moved Permanently` to `location`.
pub(crate) fn emit_redirect<W: ResponseWriter>(res: &mut W, location: &str) {
    debug!(location, "emitting redirect");
    res.cork(&mut |res| {
        res.write_status(StatusCode::MOVED_PERMANENTLY);
        res.write_header("Connection", "keep-alive");
        res.write_header("Location", location);
        res.end(&[]);
    });
}
