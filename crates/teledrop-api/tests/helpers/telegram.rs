//! Mock Bot API endpoints

use super::TEST_BOT_TOKEN;
use mockito::{Matcher, Mock, ServerGuard};

pub fn method_path(method: &str) -> String {
    format!("/bot{}/{}", TEST_BOT_TOKEN, method)
}

pub fn download_path(file_path: &str) -> String {
    format!("/file/bot{}/{}", TEST_BOT_TOKEN, file_path)
}

/// Mock a multipart send method answering with `body`
pub async fn mock_send(server: &mut ServerGuard, method: &str, body: String) -> Mock {
    server
        .mock("POST", method_path(method).as_str())
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data".to_string()),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

/// Mock `getFile` for one id
pub async fn mock_get_file(server: &mut ServerGuard, file_id: &str, body: String) -> Mock {
    server
        .mock("GET", method_path("getFile").as_str())
        .match_query(Matcher::UrlEncoded("file_id".into(), file_id.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

/// Mock the file download endpoint
pub async fn mock_download(
    server: &mut ServerGuard,
    file_path: &str,
    status: usize,
    body: &str,
) -> Mock {
    server
        .mock("GET", download_path(file_path).as_str())
        .with_status(status)
        .with_header("content-type", "application/octet-stream")
        .with_body(body)
        .create_async()
        .await
}
