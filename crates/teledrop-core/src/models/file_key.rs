use crate::constants::FILE_ROUTE_PREFIX;
use crate::error::AppError;

/// Public key of a stored file: `{fileId}.{ext}`.
///
/// The same string is the metadata store key and the last segment of the
/// retrieval URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKey {
    pub file_id: String,
    pub extension: String,
}

impl FileKey {
    pub fn new(file_id: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            extension: extension.into(),
        }
    }

    /// Split a requested key on its last dot.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let raw = raw.trim_start_matches('/');
        let (file_id, extension) = match raw.rsplit_once('.') {
            Some((id, ext)) => (id, ext),
            None => (raw, ""),
        };
        if file_id.is_empty() || file_id.contains('/') {
            return Err(AppError::InvalidInput(format!("Invalid file key '{}'", raw)));
        }
        Ok(Self::new(file_id, extension))
    }

    pub fn storage_key(&self) -> String {
        if self.extension.is_empty() {
            self.file_id.clone()
        } else {
            format!("{}.{}", self.file_id, self.extension)
        }
    }

    pub fn public_path(&self) -> String {
        format!("{}{}", FILE_ROUTE_PREFIX, self.storage_key())
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_last_dot() {
        let key = FileKey::parse("BQACAgQAAx.0.jpg").unwrap();
        assert_eq!(key.file_id, "BQACAgQAAx.0");
        assert_eq!(key.extension, "jpg");
        assert_eq!(key.storage_key(), "BQACAgQAAx.0.jpg");
        assert_eq!(key.public_path(), "/file/BQACAgQAAx.0.jpg");
    }

    #[test]
    fn test_parse_without_extension() {
        let key = FileKey::parse("AgACAgQ").unwrap();
        assert_eq!(key.extension, "");
        assert_eq!(key.storage_key(), "AgACAgQ");
    }

    #[test]
    fn test_parse_rejects_empty_id() {
        assert!(FileKey::parse(".jpg").is_err());
        assert!(FileKey::parse("").is_err());
        assert!(FileKey::parse("a/b.jpg").is_err());
    }
}
