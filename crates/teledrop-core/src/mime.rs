//! Extension and MIME type helpers shared by the upload and retrieval paths.

pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Lowercase final dot segment of a file name, empty if there is none.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

pub fn mime_from_extension(extension: &str) -> Option<String> {
    if extension.is_empty() {
        return None;
    }
    mime_guess::from_ext(extension)
        .first_raw()
        .map(str::to_string)
}

/// Extension a stored MIME type would normally be served with.
///
/// Media types map to their subtype (`image/jpeg` is `jpeg`), other types use the
/// first registered extension.
pub fn extension_from_mime(mime: &str) -> String {
    let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
    let Some((top, sub)) = essence.split_once('/') else {
        return String::new();
    };
    match top {
        "image" | "video" | "audio" => sub.split('+').next().unwrap_or(sub).to_string(),
        _ => mime_guess::get_mime_extensions_str(&essence)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_default(),
    }
}
