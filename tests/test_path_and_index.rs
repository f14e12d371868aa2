//! Path containment and index resolution.

mod common;

use async_trait::async_trait;
use common::{MockRequest, MockWriter};
use http::StatusCode;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use swiftfile::{IndexMode, IndexOutcome, IndexResolver, ServeConfig, StaticFiles};
use tempfile::TempDir;

#[tokio::test]
async fn traversal_is_rejected_with_not_found() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("safe.txt"), b"inside").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/../etc/passwd");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(res.wire, b"Not Found");
}

#[tokio::test]
async fn encoded_traversal_is_rejected() {
    let dir = TempDir::new().unwrap();
    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/%2e%2e/%2e%2e/etc/passwd");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn percent_decoded_names_resolve() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hello world.txt"), b"spaced").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/hello%20world.txt");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::OK));
    assert_eq!(res.wire, b"spaced");
}

#[tokio::test]
async fn base_prefix_is_stripped() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), b"based").unwrap();

    let config = ServeConfig {
        base: "/assets".to_string(),
        ..Default::default()
    };
    let handler = StaticFiles::new(dir.path(), config).unwrap();

    let mut res = MockWriter::new();
    handler.serve(&mut res, &MockRequest::new("/assets/a.txt")).await;

    assert_eq!(res.status(), Some(StatusCode::OK));
    assert_eq!(res.wire, b"based");
}

#[tokio::test]
async fn default_index_redirects_html_clients() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/index.html"), b"<html>app</html>").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/app")
        .with_header("accept", "text/html,application/xhtml+xml;q=0.9");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(res.header("Location"), Some("/app/index.html"));
    assert!(res.ended);
}

#[tokio::test]
async fn default_index_memoizes_rewrites() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/index.html"), b"<html>").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/app").with_header("accept", "text/html");

    let mut first = MockWriter::new();
    handler.serve(&mut first, &req).await;
    assert_eq!(first.status(), Some(StatusCode::MOVED_PERMANENTLY));

    // second hit replays the memoized rewrite
    let mut second = MockWriter::new();
    handler.serve(&mut second, &req).await;
    assert_eq!(second.status(), Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(second.header("Location"), Some("/app/index.html"));
}

#[tokio::test]
async fn trailing_slash_is_stripped_before_resolution() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/index.html"), b"<html>").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/app/").with_header("accept", "text/html");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(res.header("Location"), Some("/app/index.html"));
}

#[tokio::test]
async fn wildcard_accept_resolves_js_sibling() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("widget.js"), b"export {}").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default()).unwrap();
    let req = MockRequest::new("/widget").with_header("accept", "*/*");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(res.header("Location"), Some("/widget.js"));
}

#[tokio::test]
async fn index_off_serves_url_verbatim() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/index.html"), b"<html>").unwrap();

    let config = ServeConfig {
        index: IndexMode::Off,
        ..Default::default()
    };
    let handler = StaticFiles::new(dir.path(), config).unwrap();
    let req = MockRequest::new("/app").with_header("accept", "text/html");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    // "/app" is a directory, which is not a servable file
    assert_eq!(res.status(), Some(StatusCode::NOT_FOUND));
}

struct RewriteResolver(&'static str);

#[async_trait]
impl IndexResolver for RewriteResolver {
    async fn resolve(&self, _url: &str, _accept: &str, _root: &Path) -> IndexOutcome {
        IndexOutcome::Rewrite(self.0.to_string())
    }
}

struct FallThroughResolver;

#[async_trait]
impl IndexResolver for FallThroughResolver {
    async fn resolve(&self, _url: &str, _accept: &str, _root: &Path) -> IndexOutcome {
        IndexOutcome::FallThrough
    }
}

struct DoneResolver;

#[async_trait]
impl IndexResolver for DoneResolver {
    async fn resolve(&self, _url: &str, _accept: &str, _root: &Path) -> IndexOutcome {
        IndexOutcome::Done
    }
}

#[tokio::test]
async fn custom_resolver_rewrite_serves_target_directly() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("app")).unwrap();
    fs::write(dir.path().join("app/index.html"), b"<html>app</html>").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default())
        .unwrap()
        .with_index_resolver(Arc::new(RewriteResolver("/app/index.html")));
    let req = MockRequest::new("/app").with_header("accept", "text/html");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::OK));
    assert_eq!(res.wire, b"<html>app</html>");
}

#[tokio::test]
async fn custom_resolver_rewrite_is_revalidated() {
    let dir = TempDir::new().unwrap();
    let handler = StaticFiles::new(dir.path(), ServeConfig::default())
        .unwrap()
        .with_index_resolver(Arc::new(RewriteResolver("/../../etc/passwd")));
    let req = MockRequest::new("/app");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn custom_resolver_fall_through_serves_as_is() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plain"), b"no extension").unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default())
        .unwrap()
        .with_index_resolver(Arc::new(FallThroughResolver));
    let req = MockRequest::new("/plain");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::OK));
    assert_eq!(res.wire, b"no extension");
}

#[tokio::test]
async fn custom_resolver_done_emits_nothing() {
    let dir = TempDir::new().unwrap();

    let handler = StaticFiles::new(dir.path(), ServeConfig::default())
        .unwrap()
        .with_index_resolver(Arc::new(DoneResolver));
    let req = MockRequest::new("/anything");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert!(res.statuses.is_empty());
    assert!(res.wire.is_empty());
    assert!(!res.ended);
}

#[tokio::test]
async fn urls_with_extension_skip_index_resolution() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("direct.txt"), b"direct").unwrap();

    // the resolver would rewrite everything; extensions bypass it
    let handler = StaticFiles::new(dir.path(), ServeConfig::default())
        .unwrap()
        .with_index_resolver(Arc::new(RewriteResolver("/elsewhere")));
    let req = MockRequest::new("/direct.txt");

    let mut res = MockWriter::new();
    handler.serve(&mut res, &req).await;

    assert_eq!(res.status(), Some(StatusCode::OK));
    assert_eq!(res.wire, b"direct");
}
