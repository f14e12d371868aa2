//! Handler instance and per-request dispatch

use crate::cache::{ArtifactCache, CacheStats, IndexMemo};
use crate::config::{IndexMode, ServeConfig};
use crate::emitter;
use crate::error::{Result, ServeError};
use crate::io::{Request, ResponseWriter};
use crate::models::{Artifact, ContentCoding, RequestState};
use crate::path::{self, IndexOutcome};
use crate::reader;
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Caller-supplied index resolution for extensionless URLs.
///
/// Installing a resolver supersedes the configured [`IndexMode`]. The
/// outcome drives the dispatcher: `Done` means the resolver already
/// completed the response through its own channel and nothing further is
/// emitted; `FallThrough` serves the URL as-is; `Rewrite` serves the
/// returned root-relative path after containment re-validation.
#[async_trait]
pub trait IndexResolver: Send + Sync {
    async fn resolve(&self, url: &str, accept: &str, root: &Path) -> IndexOutcome;
}

/// Pre-compression hook over a materialized body.
///
/// Runs after the whole body is read and before compression; it may
/// rewrite `bytes` and `media_type`.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, artifact: &mut Artifact) -> Result<()>;
}

/// Replaceable bodies for the built-in error responses.
#[derive(Debug, Clone)]
pub struct ErrorPages {
    pub not_found: String,
    pub internal_error: String,
}

impl Default for ErrorPages {
    fn default() -> Self {
        ErrorPages {
            not_found: emitter::NOT_FOUND_BODY.to_string(),
            internal_error: emitter::INTERNAL_ERROR_BODY.to_string(),
        }
    }
}

/// A static-file handler bound to one root directory.
///
/// The instance exclusively owns its configuration, artifact cache and
/// index memo; deployments that run one handler per worker need no
/// shared state between them.
pub struct StaticFiles {
    pub(crate) root: PathBuf,
    pub(crate) config: ServeConfig,
    pub(crate) compressions: Vec<ContentCoding>,
    pub(crate) cache: ArtifactCache,
    pub(crate) index_memo: IndexMemo,
    pub(crate) index_resolver: Option<Arc<dyn IndexResolver>>,
    pub(crate) transform: Option<Arc<dyn Transform>>,
    pub(crate) error_pages: ErrorPages,
}

impl StaticFiles {
    /// Create a handler serving the subtree rooted at `folder`.
    ///
    /// Validates the configuration and canonicalizes the root; the root
    /// must exist.
    pub fn new(folder: impl Into<PathBuf>, config: ServeConfig) -> Result<Self> {
        config.validate()?;
        let folder = folder.into();
        let root = folder
            .canonicalize()
            .map_err(|e| ServeError::Config(format!("root {}: {e}", folder.display())))?;
        let compressions = config.effective_compressions();
        Ok(StaticFiles {
            root,
            config,
            compressions,
            cache: ArtifactCache::new(),
            index_memo: IndexMemo::new(),
            index_resolver: None,
            transform: None,
            error_pages: ErrorPages::default(),
        })
    }

    /// Install a caller-supplied index resolver.
    pub fn with_index_resolver(mut self, resolver: Arc<dyn IndexResolver>) -> Self {
        self.index_resolver = Some(resolver);
        self
    }

    /// Install a pre-compression transform hook.
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Replace the built-in error response bodies.
    pub fn with_error_pages(mut self, pages: ErrorPages) -> Self {
        self.error_pages = pages;
        self
    }

    /// The canonicalized root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of the artifact cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached artifacts and index memoizations.
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.index_memo.clear();
    }

    /// Handle one request.
    ///
    /// This is the handler shape the embedding server calls: it always
    /// completes the response itself (file, redirect or error page)
    /// unless the request was aborted, in which case nothing is emitted.
    pub async fn serve<W: ResponseWriter, R: Request>(&self, res: &mut W, req: &R) {
        let state = self.request_state(res, req);
        debug!(url = %state.url, ext = %state.ext, "dispatching request");
        if let Err(err) = self.dispatch(res, &state).await {
            self.emit_error(res, &state, err);
        }
    }

    fn request_state<W: ResponseWriter, R: Request>(&self, res: &W, req: &R) -> RequestState {
        let raw = req.url();
        let stripped = if self.config.base.is_empty() {
            raw
        } else {
            raw.strip_prefix(&self.config.base).unwrap_or(raw)
        };
        let mut url = percent_decode_str(stripped)
            .decode_utf8_lossy()
            .into_owned();
        if !url.starts_with('/') {
            url.insert(0, '/');
        }
        let ext = url
            .rfind('.')
            .map(|i| url[i + 1..].to_ascii_lowercase())
            .unwrap_or_default();
        RequestState {
            url,
            ext,
            accept: req.header("accept").to_string(),
            accept_encoding: req.header("accept-encoding").to_string(),
            range: req.header("range").to_string(),
            abort: res.abort_signal(),
        }
    }

    async fn dispatch<W: ResponseWriter>(&self, res: &mut W, state: &RequestState) -> Result<()> {
        if state.ext.is_empty() {
            if let Some(resolver) = &self.index_resolver {
                match resolver
                    .resolve(&state.url, &state.accept, &self.root)
                    .await
                {
                    IndexOutcome::Done => return Ok(()),
                    IndexOutcome::FallThrough => {}
                    IndexOutcome::Rewrite(target) => {
                        debug!(url = %state.url, target = %target, "custom index rewrite");
                        return reader::serve_path(self, res, state, &target).await;
                    }
                }
            } else if self.config.index == IndexMode::Default {
                return self.serve_with_default_index(res, state).await;
            }
        }
        reader::serve_path(self, res, state, &state.url).await
    }

    async fn serve_with_default_index<W: ResponseWriter>(
        &self,
        res: &mut W,
        state: &RequestState,
    ) -> Result<()> {
        if self.config.cache {
            if let Some(target) = self.index_memo.get(&state.url) {
                if state.is_aborted() {
                    return Err(ServeError::Aborted);
                }
                emitter::emit_redirect(res, &target);
                return Ok(());
            }
        }

        let bare = state.url.strip_suffix('/').unwrap_or(&state.url);
        let target = path::find_index(&self.root, bare, &state.accept).await;
        if state.is_aborted() {
            return Err(ServeError::Aborted);
        }

        if target != bare {
            if self.config.cache {
                self.index_memo.insert(state.url.clone(), target.clone());
            }
            emitter::emit_redirect(res, &target);
            return Ok(());
        }
        reader::serve_path(self, res, state, &state.url).await
    }

    fn emit_error<W: ResponseWriter>(&self, res: &mut W, state: &RequestState, err: ServeError) {
        if state.is_aborted() {
            return;
        }
        match err {
            ServeError::NotFound => emitter::emit_not_found(res, &self.error_pages.not_found),
            ServeError::NotSatisfiable { size } => emitter::emit_not_satisfiable(res, size),
            ServeError::Aborted => {}
            ServeError::Config(detail) | ServeError::Internal(detail) => {
                error!(url = %state.url, detail = %detail, "internal error while serving");
                emitter::emit_internal_error(res, &self.error_pages.internal_error, &detail);
            }
        }
    }
}
