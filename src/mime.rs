//! MIME resolution and compressibility classification

/// Resolve a lowercased extension (no dot) to a media type.
///
/// Returns `None` for unknown extensions; the response then carries no
/// `Content-Type` header rather than guessing `application/octet-stream`.
pub fn media_type_for_ext(ext: &str) -> Option<String> {
    if ext.is_empty() {
        return None;
    }
    let guess = mime_guess::from_ext(ext).first()?;
    let mut media_type = guess.essence_str().to_owned();
    // mime_guess still reports the legacy token for .js
    if media_type == "application/javascript" {
        media_type = "text/javascript".to_owned();
    }
    Some(media_type)
}

/// Whether bodies of this media type are worth compressing.
///
/// The set is closed: textual types, the common structured-text
/// application types, SVG and wasm. Already-compressed formats (images,
/// video, archives) are excluded by not being listed.
pub fn is_compressible(media_type: &str) -> bool {
    if media_type.starts_with("text/") {
        return true;
    }
    matches!(
        media_type,
        "application/json"
            | "application/javascript"
            | "application/xml"
            | "application/wasm"
            | "application/xhtml+xml"
            | "image/svg+xml"
    ) || media_type.ends_with("+json")
        || media_type.ends_with("+xml")
}
