//! Decides which upstream endpoint family a file goes through.
//!
//! Images the upstream photo endpoint cannot render, or that it would
//! recompress, are sent as documents so the original bytes survive.

use crate::constants::{DOCUMENT_ONLY_IMAGE_EXTENSIONS, PHOTO_MAX_SIZE_BYTES};
use crate::error::AppError;
use crate::models::{ClassifiedFile, IncomingFile, MediaKind};

pub fn classify(extension: &str, mime: &str, size: u64) -> MediaKind {
    let mime = mime.trim().to_lowercase();
    if mime.starts_with("image/") {
        let extension = extension.to_lowercase();
        if DOCUMENT_ONLY_IMAGE_EXTENSIONS.contains(&extension.as_str())
            || size > PHOTO_MAX_SIZE_BYTES
        {
            MediaKind::Document
        } else {
            MediaKind::Photo
        }
    } else if mime.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Document
    }
}

pub fn classify_file(file: IncomingFile) -> ClassifiedFile {
    let kind = classify(&file.extension, &file.mime, file.size());
    ClassifiedFile { kind, file }
}

/// Rejects files above the direct upload ceiling before anything is sent.
pub fn ensure_within_limit(size: u64, limit: u64) -> Result<(), AppError> {
    if size > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds Telegram API direct upload limit ({}MB)",
            limit / 1024 / 1024
        )));
    }
    Ok(())
}
