use std::path::Path;

/// MIME type used when the extension is unknown.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Detects a MIME type from the file extension.
pub fn detect_content_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("svg") => Some("image/svg+xml"),
        Some("ico") => Some("image/x-icon"),
        Some("txt") => Some("text/plain"),
        Some("html" | "htm") => Some("text/html"),
        Some("css") => Some("text/css"),
        Some("csv") => Some("text/csv"),
        Some("md") => Some("text/markdown"),
        Some("js") => Some("text/javascript"),
        Some("json") => Some("application/json"),
        Some("pdf") => Some("application/pdf"),
        Some("zip") => Some("application/zip"),
        Some("gz") => Some("application/gzip"),
        Some("tar") => Some("application/x-tar"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        _ => None,
    }
}

/// Explicit type if given, else detected, else [`FALLBACK_MIME`].
pub fn resolve(explicit: Option<&str>, path: &Path) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| detect_content_type(path).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}
