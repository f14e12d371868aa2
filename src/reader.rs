//! File reader: cache lookup, whole-file materialization, stream handoff

use crate::emitter;
use crate::encoding;
use crate::error::{Result, ServeError};
use crate::handler::StaticFiles;
use crate::io::ResponseWriter;
use crate::mime;
use crate::models::{Artifact, ContentCoding, RequestState};
use crate::path;
use crate::pump;
use bytes::Bytes;
use std::time::UNIX_EPOCH;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Serve `url` (the request URL or an index rewrite target) relative to
/// the handler's root.
///
/// Containment is checked here, so rewrite strings from custom index
/// resolvers get re-validated on the same path as ordinary URLs. Small
/// files are materialized (transform → compress → cache → emit); large
/// files and range requests hand the opened file to the stream pump.
/// Every await is followed by an abort re-check so a disconnected client
/// costs no further work and no emission.
pub(crate) async fn serve_path<W: ResponseWriter>(
    handler: &StaticFiles,
    res: &mut W,
    state: &RequestState,
    url: &str,
) -> Result<()> {
    let Some(abs) = path::resolve(&handler.root, url) else {
        return Err(ServeError::NotFound);
    };
    let abs_str = abs.to_string_lossy().into_owned();

    let ext = url
        .rfind('.')
        .map(|i| url[i + 1..].to_ascii_lowercase())
        .unwrap_or_default();
    let media_type = mime::media_type_for_ext(&ext);
    let negotiated = encoding::negotiate(
        &state.accept_encoding,
        &handler.compressions,
        media_type.as_deref(),
    );

    let range_driven = !state.range.is_empty();
    if !range_driven && handler.config.cache {
        if let Some(artifact) = handler.cache.lookup(&abs_str, negotiated) {
            if state.is_aborted() {
                return Err(ServeError::Aborted);
            }
            emitter::emit_artifact(res, &handler.config, &artifact);
            return Ok(());
        }
    }

    let file = File::open(&abs).await?;
    if state.is_aborted() {
        return Err(ServeError::Aborted);
    }
    let meta = file.metadata().await?;
    if state.is_aborted() {
        return Err(ServeError::Aborted);
    }
    if meta.is_dir() {
        return Err(ServeError::NotFound);
    }

    let size = meta.len();
    let mtime = meta.modified().unwrap_or(UNIX_EPOCH);

    let mut coding = negotiated;
    if size < handler.config.min_compress_size {
        coding = ContentCoding::Identity;
    }

    if range_driven || size >= handler.config.min_stream_size {
        return pump::pump(
            res,
            &handler.config,
            state,
            file,
            size,
            mtime,
            coding,
            media_type,
        )
        .await;
    }

    // The size check may have forced identity after the shard lookup
    // above missed under the negotiated coding.
    if coding != negotiated && handler.config.cache {
        if let Some(artifact) = handler.cache.lookup(&abs_str, coding) {
            emitter::emit_artifact(res, &handler.config, &artifact);
            return Ok(());
        }
    }

    let mut file = file;
    let mut buffer = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buffer).await?;
    if state.is_aborted() {
        return Err(ServeError::Aborted);
    }
    debug!(path = %abs_str, size, coding = ?coding, "materialized file");

    let mut artifact = Artifact {
        path: abs_str,
        mtime,
        bytes: Bytes::from(buffer),
        encoding: coding,
        media_type,
    };

    if let Some(transform) = &handler.transform {
        transform.apply(&mut artifact).await?;
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }
    }

    if !artifact.encoding.is_identity() {
        artifact.bytes = encoding::compress(&artifact.bytes, artifact.encoding)?;
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }
    }

    if handler.config.cache && size < handler.config.max_cache_size {
        handler.cache.insert(artifact.clone());
    }

    if state.is_aborted() {
        return Err(ServeError::Aborted);
    }
    emitter::emit_artifact(res, &handler.config, &artifact);
    Ok(())
}
