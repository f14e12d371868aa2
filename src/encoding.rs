//! Content-encoding negotiation and compressors
//!
//! Negotiation intersects the client's `Accept-Encoding` preference list
//! with the server's ordered preference and the compressibility of the
//! media type. Compression comes in two shapes: whole-body (for bodies
//! that are materialized and possibly cached) and streaming (for the pump,
//! where the final length is unknown until the compressor flushes).

use crate::error::{Result, ServeError};
use crate::mime;
use crate::models::ContentCoding;
use bytes::Bytes;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::Write;

/// One entry of a parsed `Accept-Encoding` header that survived the
/// intersection with the server preference list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedEncoding {
    pub coding: ContentCoding,
    pub quality: f32,
}

/// Parse an `Accept-Encoding` header against a server preference list.
///
/// Entries are split on `,`, quality taken from an optional `;q=` suffix
/// (1.0 when absent). Entries with `q == 0` and codings the server does
/// not offer are dropped. The result is sorted by descending quality;
/// ties are broken by the server's own preference order.
pub fn parse_accept_encoding(
    header: &str,
    server_preference: &[ContentCoding],
) -> Vec<AcceptedEncoding> {
    let mut accepted: Vec<(usize, AcceptedEncoding)> = Vec::new();

    for entry in header.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, quality) = match entry.split_once(";q=") {
            Some((name, q)) => (name.trim(), q.trim().parse::<f32>().unwrap_or(1.0)),
            None => (entry, 1.0),
        };
        if quality == 0.0 {
            continue;
        }
        let Some(coding) = ContentCoding::from_token(name) else {
            continue;
        };
        let Some(rank) = server_preference.iter().position(|c| *c == coding) else {
            continue;
        };
        accepted.push((rank, AcceptedEncoding { coding, quality }));
    }

    accepted.sort_by(|(rank_a, a), (rank_b, b)| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(rank_a.cmp(rank_b))
    });
    accepted.into_iter().map(|(_, e)| e).collect()
}

/// Pick the coding for a response.
///
/// Identity is returned when the header is empty, the server offers no
/// codings, the media type is unknown, or the media type is not
/// compressible. Otherwise the first accepted coding wins.
pub fn negotiate(
    header: &str,
    server_preference: &[ContentCoding],
    media_type: Option<&str>,
) -> ContentCoding {
    if header.is_empty() || server_preference.is_empty() {
        return ContentCoding::Identity;
    }
    let Some(media_type) = media_type else {
        return ContentCoding::Identity;
    };
    if !mime::is_compressible(media_type) {
        return ContentCoding::Identity;
    }
    parse_accept_encoding(header, server_preference)
        .first()
        .map(|e| e.coding)
        .unwrap_or(ContentCoding::Identity)
}

/// Compress a whole body into the target coding.
pub fn compress(data: &[u8], coding: ContentCoding) -> Result<Bytes> {
    match coding {
        ContentCoding::Identity => Ok(Bytes::copy_from_slice(data)),
        ContentCoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            Ok(Bytes::from(encoder.finish()?))
        }
        ContentCoding::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            Ok(Bytes::from(encoder.finish()?))
        }
        ContentCoding::Brotli => {
            let mut input = std::io::Cursor::new(data);
            let mut output = Vec::new();
            brotli::BrotliCompress(
                &mut input,
                &mut output,
                &brotli::enc::BrotliEncoderParams::default(),
            )
            .map_err(|e| ServeError::Internal(format!("brotli: {e}")))?;
            Ok(Bytes::from(output))
        }
    }
}

/// Incremental compressor used by the stream pump.
///
/// `push` returns whatever compressed output the flush made available;
/// `finish` returns the trailer. The total output length is unknown until
/// `finish`, which is why the pump's compressed path writes without a
/// byte total.
pub enum StreamCompressor {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(ZlibEncoder<Vec<u8>>),
    Brotli(Box<brotli::CompressorWriter<Vec<u8>>>),
}

impl StreamCompressor {
    /// Create a compressor for the coding, or `None` for identity.
    pub fn new(coding: ContentCoding) -> Option<Self> {
        match coding {
            ContentCoding::Identity => None,
            ContentCoding::Gzip => Some(StreamCompressor::Gzip(GzEncoder::new(
                Vec::new(),
                Compression::default(),
            ))),
            ContentCoding::Deflate => Some(StreamCompressor::Deflate(ZlibEncoder::new(
                Vec::new(),
                Compression::default(),
            ))),
            ContentCoding::Brotli => Some(StreamCompressor::Brotli(Box::new(
                brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22),
            ))),
        }
    }

    /// Feed a chunk and take the compressed output produced so far.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Bytes> {
        match self {
            StreamCompressor::Gzip(encoder) => {
                encoder.write_all(chunk)?;
                encoder.flush()?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
            StreamCompressor::Deflate(encoder) => {
                encoder.write_all(chunk)?;
                encoder.flush()?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
            StreamCompressor::Brotli(encoder) => {
                encoder.write_all(chunk)?;
                encoder.flush()?;
                Ok(Bytes::from(std::mem::take(encoder.get_mut())))
            }
        }
    }

    /// Finalize the stream and take the trailer bytes.
    pub fn finish(self) -> Result<Bytes> {
        match self {
            StreamCompressor::Gzip(encoder) => Ok(Bytes::from(encoder.finish()?)),
            StreamCompressor::Deflate(encoder) => Ok(Bytes::from(encoder.finish()?)),
            StreamCompressor::Brotli(encoder) => Ok(Bytes::from(encoder.into_inner())),
        }
    }
}
