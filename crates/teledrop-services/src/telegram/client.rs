use anyhow::Context;
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use teledrop_core::{ClassifiedFile, Config, IncomingFile, MediaKind};

use super::retry::{send_with_retry, RetryPolicy, UpstreamError};
use super::types::{ApiResponse, Message, TgFile};
use crate::upstream::Upstream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot API client bound to one bot token and one target chat
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramClient {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        retry: RetryPolicy,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            retry,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.telegram_api_base(),
            config.telegram_bot_token(),
            config.telegram_chat_id(),
            RetryPolicy::from_config(config),
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token,
            file_path.trim_start_matches('/')
        )
    }

    /// POST a multipart form under the retry policy. The form is rebuilt for every attempt.
    async fn call<T, F>(&self, method: &str, build_form: F) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned,
        F: Fn() -> Form,
    {
        send_with_retry(&self.retry, method, move || {
            self.post_form(method, build_form())
        })
        .await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        read_envelope(response).await
    }

    async fn get_file(&self, file_id: &str) -> Result<TgFile, UpstreamError> {
        let response = self
            .http
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;

        read_envelope(response).await
    }

    fn single_form(&self, field: &str, file: &IncomingFile) -> Form {
        Form::new()
            .text("chat_id", self.chat_id.clone())
            .part(field.to_string(), file_part(file))
    }

    fn media_group_form(&self, items: &[ClassifiedFile]) -> Form {
        let media: Vec<serde_json::Value> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::json!({
                    "type": item.kind.as_str(),
                    "media": format!("attach://file{}", i),
                })
            })
            .collect();

        let mut form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("media", serde_json::Value::Array(media).to_string());

        for (i, item) in items.iter().enumerate() {
            form = form.part(format!("file{}", i), file_part(&item.file));
        }
        form
    }
}

#[async_trait]
impl Upstream for TelegramClient {
    async fn send_single(
        &self,
        kind: MediaKind,
        file: &IncomingFile,
    ) -> Result<Message, UpstreamError> {
        let (method, field) = match kind {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Document => ("sendDocument", "document"),
        };

        tracing::debug!(
            method,
            file_name = %file.name,
            size = file.size(),
            "Sending file upstream"
        );

        self.call(method, || self.single_form(field, file)).await
    }

    async fn send_media_group(
        &self,
        items: &[ClassifiedFile],
    ) -> Result<Vec<Message>, UpstreamError> {
        tracing::debug!(items = items.len(), "Sending media group upstream");

        self.call("sendMediaGroup", || self.media_group_form(items))
            .await
    }

    async fn resolve_file_path(&self, file_id: &str) -> Result<Option<String>, UpstreamError> {
        let result =
            send_with_retry(&self.retry, "getFile", move || self.get_file(file_id)).await;

        match result {
            Ok(file) => Ok(file.file_path.filter(|p| !p.is_empty())),
            Err(UpstreamError::Rejected { description, .. }) => {
                tracing::debug!(file_id, description = %description, "getFile rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_file(
        &self,
        file_path: &str,
        headers: HeaderMap,
    ) -> Result<reqwest::Response, UpstreamError> {
        let request = self.http.get(self.file_url(file_path)).headers(headers);

        match tokio::time::timeout(self.retry.timeout, request.send()).await {
            Ok(response) => response.map_err(UpstreamError::from_reqwest),
            Err(_) => Err(UpstreamError::Timeout),
        }
    }
}

fn file_part(file: &IncomingFile) -> Part {
    let part = || {
        Part::stream_with_length(reqwest::Body::from(file.data.clone()), file.size())
            .file_name(file.name.clone())
    };
    part().mime_str(&file.mime).unwrap_or_else(|_| part())
}

async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(UpstreamError::from_reqwest)?;

    interpret_envelope(status, &body)
}

/// Turn a raw Bot API response into a result. 5xx and 429 are transient; any other
/// failure, including HTTP 200 with `ok: false`, is a rejection.
pub(crate) fn interpret_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, UpstreamError> {
    let envelope = serde_json::from_slice::<ApiResponse<T>>(body);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        let message = envelope
            .ok()
            .and_then(|e| e.description)
            .unwrap_or_else(|| status.to_string());
        return Err(UpstreamError::Transient {
            status: status.as_u16(),
            message,
        });
    }

    match envelope {
        Ok(envelope) if envelope.ok && status.is_success() => envelope
            .result
            .ok_or_else(|| UpstreamError::Decode("response carries no result".to_string())),
        Ok(envelope) => Err(UpstreamError::Rejected {
            description: envelope
                .description
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            error_code: envelope.error_code.or(Some(i64::from(status.as_u16()))),
        }),
        Err(e) if status.is_success() => Err(UpstreamError::Decode(e.to_string())),
        Err(_) => Err(UpstreamError::Rejected {
            description: format!("HTTP {}", status),
            error_code: Some(i64::from(status.as_u16())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::Matcher;

    const TOKEN: &str = "123:TEST";

    fn client(base: &str) -> TelegramClient {
        let retry = RetryPolicy {
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        TelegramClient::new(base, TOKEN, "-1001", retry).unwrap()
    }

    fn jpeg(name: &str) -> IncomingFile {
        IncomingFile::new(name, Some("image/jpeg"), Bytes::from_static(b"\xff\xd8\xff\xe0"))
    }

    #[test]
    fn test_interpret_ok_false_is_rejected() {
        let body = br#"{"ok":false,"error_code":400,"description":"Bad Request: IMAGE_PROCESS_FAILED"}"#;
        let err = interpret_envelope::<Message>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, UpstreamError::Rejected { .. }));
        assert!(err.is_image_process_failed());
    }

    #[test]
    fn test_interpret_throttling_is_transient() {
        let body = br#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 3"}"#;
        let err = interpret_envelope::<Message>(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("retry after 3"));
    }

    #[test]
    fn test_interpret_html_error_page() {
        let err = interpret_envelope::<Message>(StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert!(matches!(err, UpstreamError::Transient { status: 502, .. }));

        let err = interpret_envelope::<Message>(StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[tokio::test]
    async fn test_send_document_hits_method_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendDocument", TOKEN).as_str())
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"ok":true,"result":{"message_id":5,"document":{"file_id":"DOC1","thumbnail":{"file_id":"TH1","width":90,"height":90}}}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let file = IncomingFile::new("report.pdf", Some("application/pdf"), Bytes::from_static(b"%PDF-1.7"));
        let message = client(&server.url())
            .send_single(MediaKind::Document, &file)
            .await
            .unwrap();

        mock.assert_async().await;
        let remote = message.remote_ref().unwrap();
        assert_eq!(remote.file_id, "DOC1");
        assert_eq!(remote.thumbnail_id.as_deref(), Some("TH1"));
    }

    #[tokio::test]
    async fn test_send_photo_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendPhoto", TOKEN).as_str())
            .with_status(502)
            .with_body("Bad Gateway")
            .expect(3)
            .create_async()
            .await;

        let err = client(&server.url())
            .send_single(MediaKind::Photo, &jpeg("cat.jpg"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, UpstreamError::Transient { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_rejection_is_sent_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendPhoto", TOKEN).as_str())
            .with_status(400)
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server.url())
            .send_single(MediaKind::Photo, &jpeg("cat.jpg"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.to_string(), "Bad Request: chat not found");
    }

    #[tokio::test]
    async fn test_media_group_returns_messages_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/bot{}/sendMediaGroup", TOKEN).as_str())
            .with_status(200)
            .with_body(
                r#"{"ok":true,"result":[
                    {"message_id":1,"photo":[{"file_id":"p1s","width":90,"height":90},{"file_id":"p1l","width":900,"height":900}]},
                    {"message_id":2,"video":{"file_id":"v2"}}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let items = vec![
            ClassifiedFile {
                kind: MediaKind::Photo,
                file: jpeg("a.jpg"),
            },
            ClassifiedFile {
                kind: MediaKind::Video,
                file: IncomingFile::new("b.mp4", Some("video/mp4"), Bytes::from_static(b"mp4")),
            },
        ];
        let messages = client(&server.url()).send_media_group(&items).await.unwrap();

        mock.assert_async().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].remote_ref().unwrap().file_id, "p1l");
        assert_eq!(messages[1].remote_ref().unwrap().file_id, "v2");
    }

    #[tokio::test]
    async fn test_resolve_file_path() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/bot{}/getFile", TOKEN).as_str())
            .match_query(Matcher::UrlEncoded("file_id".into(), "DOC1".into()))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"file_id":"DOC1","file_path":"documents/file_3.pdf"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", format!("/bot{}/getFile", TOKEN).as_str())
            .match_query(Matcher::UrlEncoded("file_id".into(), "GONE".into()))
            .with_status(400)
            .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file_id"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        assert_eq!(
            client.resolve_file_path("DOC1").await.unwrap().as_deref(),
            Some("documents/file_3.pdf")
        );
        assert_eq!(client.resolve_file_path("GONE").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_file_forwards_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/file/bot{}/photos/file_1.jpg", TOKEN).as_str())
            .match_header("range", "bytes=0-3")
            .with_status(206)
            .with_body("abcd")
            .create_async()
            .await;

        let mut headers = HeaderMap::new();
        headers.insert(http::header::RANGE, "bytes=0-3".parse().unwrap());
        let response = client(&server.url())
            .fetch_file("photos/file_1.jpg", headers)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.text().await.unwrap(), "abcd");
    }
}
