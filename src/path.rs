//! URL to filesystem path resolution, containment and index lookup

use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a decoded URL to an absolute path under `root`.
///
/// Segments are joined onto `root` with `.` dropped and `..` popping one
/// component. After joining, the result must still begin with `root`;
/// anything that escaped resolves to `None` and is reported as not found.
/// Rewrite strings returned by index resolvers go through this same
/// check before being opened.
pub fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in url.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            segment => path.push(segment),
        }
    }

    if path.starts_with(root) {
        Some(path)
    } else {
        debug!(url, root = %root.display(), "path escaped root");
        None
    }
}

/// Outcome of index resolution for an extensionless URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The resolver completed the response itself; emit nothing.
    Done,
    /// Skip index logic and serve the URL as-is.
    FallThrough,
    /// Serve this root-relative path instead; containment is re-checked.
    Rewrite(String),
}

/// Default index policy for an extensionless URL (trailing slash already
/// stripped by the caller).
///
/// Returns the URL to serve, which equals the input when no rewrite
/// applies:
/// 1. the URL already names a regular file: unchanged;
/// 2. HTML clients: `<url>/index.html`, then `<url>.html`;
/// 3. wildcard (`*/*`) clients: `<url>/index.js`, then `<url>.js`;
/// 4. otherwise unchanged.
pub async fn find_index(root: &Path, url: &str, accept: &str) -> String {
    if is_regular_file(root, url).await {
        return url.to_string();
    }

    let candidates = if accept.starts_with("text/html") {
        [format!("{url}/index.html"), format!("{url}.html")]
    } else if accept == "*/*" {
        [format!("{url}/index.js"), format!("{url}.js")]
    } else {
        return url.to_string();
    };

    for candidate in candidates {
        if is_regular_file(root, &candidate).await {
            debug!(url, target = candidate.as_str(), "index resolved");
            return candidate;
        }
    }
    url.to_string()
}

async fn is_regular_file(root: &Path, url: &str) -> bool {
    let Some(path) = resolve(root, url) else {
        return false;
    };
    match tokio::fs::metadata(&path).await {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    }
}
