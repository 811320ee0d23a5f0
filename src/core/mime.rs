//! Extension-based MIME lookup.
//!
//! This is a best-effort lookup on the file name only. File contents are never read.

/// MIME type used when nothing better is known. Launchers treat it as "any app".
pub const WILDCARD_MIME: &str = "*/*";

/// Looks up an already lower-cased extension in the fixed table.
pub fn lookup_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "mp4" => Some("video/mp4"),
        "mp3" => Some("audio/mpeg"),
        _ => None,
    }
}

/// Returns the lower-cased text after the last `.` of the path's file name.
///
/// A dot inside a directory name does not count, so `a.d/file` has no extension.
pub fn extension_of(path: &str) -> Option<String> {
    let file_name = path
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Resolves the content type for a request using the fixed table only.
pub fn resolve_type(path: Option<&str>, explicit: Option<&str>) -> String {
    resolve_type_with(path, explicit, false)
}

/// Resolves the content type for a request.
///
/// An explicit, non-empty type always wins. Otherwise the extension goes through
/// the fixed table; with `extended` set, table misses consult the `mime_guess`
/// database before falling back to [`WILDCARD_MIME`].
pub fn resolve_type_with(path: Option<&str>, explicit: Option<&str>, extended: bool) -> String {
    if let Some(explicit) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return explicit.to_string();
    }

    let Some(extension) = path.and_then(extension_of) else {
        return WILDCARD_MIME.to_string();
    };

    if let Some(mime) = lookup_extension(&extension) {
        return mime.to_string();
    }

    if extended {
        if let Some(guess) = mime_guess::from_ext(&extension).first() {
            return guess.essence_str().to_string();
        }
    }

    WILDCARD_MIME.to_string()
}
