//! Configuration for a handler instance

use crate::error::{Result, ServeError};
use crate::models::ContentCoding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How extensionless URLs are resolved to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// No index resolution; extensionless URLs are served verbatim.
    Off,
    /// The built-in policy: `index.html` / `.html` siblings for HTML
    /// clients, `index.js` / `.js` for wildcard clients.
    Default,
}

/// Configuration for a [`StaticFiles`](crate::StaticFiles) handler.
///
/// Immutable once bound to a handler instance. Behavioral hooks (custom
/// index resolver, transform, replacement error pages) are not part of
/// this struct; they are installed on the handler with its `with_*`
/// builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// URL prefix consumed before the served path begins (default: empty).
    #[serde(default)]
    pub base: String,

    /// Index resolution mode (default: the built-in policy).
    #[serde(default = "default_index")]
    pub index: IndexMode,

    /// Whether the handler sits behind TLS. Influences the default
    /// compression list: brotli is offered only on secure transports.
    #[serde(default)]
    pub secure: bool,

    /// Ordered server compression preference. When absent the list is
    /// derived from `secure`; an explicit empty list disables compression.
    #[serde(default)]
    pub compressions: Option<Vec<ContentCoding>>,

    /// Emit a `Last-Modified` header (default: true).
    #[serde(default = "default_true")]
    pub last_modified: bool,

    /// Emit an `ETag` header (default: true).
    #[serde(default = "default_true")]
    pub etag: bool,

    /// Enable the artifact and index caches (default: true).
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Files of at least this many bytes stream instead of being fully
    /// buffered (default: 3 MiB).
    #[serde(default = "default_min_stream_size")]
    pub min_stream_size: u64,

    /// Files of at least this many bytes are never admitted to the
    /// artifact cache (default: 1 MiB).
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: u64,

    /// Files below this many bytes are never compressed (default: 1280).
    #[serde(default = "default_min_compress_size")]
    pub min_compress_size: u64,
}

fn default_index() -> IndexMode {
    IndexMode::Default
}

fn default_true() -> bool {
    true
}

fn default_min_stream_size() -> u64 {
    3 * 1024 * 1024
}

fn default_max_cache_size() -> u64 {
    1024 * 1024
}

fn default_min_compress_size() -> u64 {
    1280
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            base: String::new(),
            index: default_index(),
            secure: false,
            compressions: None,
            last_modified: default_true(),
            etag: default_true(),
            cache: default_true(),
            min_stream_size: default_min_stream_size(),
            max_cache_size: default_max_cache_size(),
            min_compress_size: default_min_compress_size(),
        }
    }
}

impl ServeConfig {
    /// Load configuration from a YAML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ServeError::Config(format!("failed to read config file: {e}")))?;
        let config: ServeConfig = serde_yaml::from_str(&content)
            .map_err(|e| ServeError::Config(format!("failed to parse config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// - `base` must be empty or start with `/`
    /// - `min_stream_size` must be greater than 0
    /// - `max_cache_size` must be greater than 0 when caching is enabled
    /// - an explicit compression list must not contain `identity`
    pub fn validate(&self) -> Result<()> {
        if !self.base.is_empty() && !self.base.starts_with('/') {
            return Err(ServeError::Config(format!(
                "base must be empty or start with '/', got {:?}",
                self.base
            )));
        }
        if self.min_stream_size == 0 {
            return Err(ServeError::Config(
                "min_stream_size must be greater than 0".to_string(),
            ));
        }
        if self.cache && self.max_cache_size == 0 {
            return Err(ServeError::Config(
                "max_cache_size must be greater than 0 when caching is enabled".to_string(),
            ));
        }
        if let Some(compressions) = &self.compressions {
            if compressions.contains(&ContentCoding::Identity) {
                return Err(ServeError::Config(
                    "compressions must list compressors only; identity is implicit".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The effective server compression preference list.
    ///
    /// An explicit list wins; otherwise `secure` decides whether brotli
    /// joins gzip and deflate.
    pub fn effective_compressions(&self) -> Vec<ContentCoding> {
        match &self.compressions {
            Some(list) => list.clone(),
            None if self.secure => vec![
                ContentCoding::Brotli,
                ContentCoding::Gzip,
                ContentCoding::Deflate,
            ],
            None => vec![ContentCoding::Gzip, ContentCoding::Deflate],
        }
    }
}
