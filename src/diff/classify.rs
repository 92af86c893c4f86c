//! Binary/text classification and context-size policy.

use super::change::FileType;
use std::path::Path;

/// Context window used when full-file context would be too expensive.
pub const LESS_CONTEXT_LINES: usize = 100;

/// Decide whether a pair of buffers must be treated as binary.
///
/// Evaluated in order: either side larger than `max_text_size`, either side
/// containing a NUL byte, either side failing UTF-8 decoding.
pub fn is_binary(old: &[u8], new: &[u8], max_text_size: usize) -> bool {
    if old.len() > max_text_size || new.len() > max_text_size {
        return true;
    }
    if old.contains(&0) || new.contains(&0) {
        return true;
    }
    std::str::from_utf8(old).is_err() || std::str::from_utf8(new).is_err()
}

/// File type tag of a binary change, from the MIME types of both sides.
pub fn binary_file_type(old_mime: &str, new_mime: &str) -> FileType {
    if old_mime.starts_with("image/") || new_mime.starts_with("image/") {
        FileType::Image
    } else {
        FileType::Binary
    }
}

/// Lines of context to request when diffing two text buffers.
///
/// Large files, or an explicit request for less context, get a small fixed
/// window; everything else effectively gets the whole file.
pub fn context_size(less_context: bool, file_size: usize, max_context_size: usize) -> usize {
    if less_context || file_size > max_context_size {
        LESS_CONTEXT_LINES
    } else {
        max_context_size
    }
}

/// Guess a MIME type from the path's extension. Unknown types yield `""`.
pub fn guess_mime(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        _ => "",
    }
}
