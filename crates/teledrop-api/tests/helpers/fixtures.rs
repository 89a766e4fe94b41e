//! Test fixtures: image blobs and canned Bot API payloads.

/// Minimal valid 1x1 PNG bytes.
pub fn create_minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0x89, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// JPEG-looking blob of exactly `size` bytes (SOI marker, filler, EOI marker).
pub fn create_jpeg(size: usize) -> Vec<u8> {
    assert!(size >= 4);
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
    data.resize(size - 2, 0x5A);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// `sendDocument` result carrying a document with a thumbnail
pub fn document_message(file_id: &str, thumbnail_id: &str) -> String {
    format!(
        r#"{{"ok":true,"result":{{"message_id":11,"document":{{"file_id":"{}","file_size":12582912,"thumbnail":{{"file_id":"{}","width":320,"height":240}}}}}}}}"#,
        file_id, thumbnail_id
    )
}

/// `sendPhoto` result with a small and a large variant
pub fn photo_message(small_id: &str, large_id: &str) -> String {
    format!(
        r#"{{"ok":true,"result":{{"message_id":12,"photo":[{{"file_id":"{}","width":90,"height":90,"file_size":1200}},{{"file_id":"{}","width":800,"height":800,"file_size":64000}}]}}}}"#,
        small_id, large_id
    )
}

/// `getFile` result
pub fn file_path_result(file_id: &str, file_path: &str) -> String {
    format!(
        r#"{{"ok":true,"result":{{"file_id":"{}","file_path":"{}"}}}}"#,
        file_id, file_path
    )
}
