//! Test helpers: build the router against in-memory namespaces and a mocked Bot API.
//!
//! Run from workspace root: `cargo test -p teledrop-api`.

pub mod fixtures;
pub mod telegram;

use axum_test::TestServer;
use std::sync::Arc;
use teledrop_api::constants::{
    HEADER_CHUNK_INDEX, HEADER_FILE_ID, HEADER_FILE_MIME_TYPE, HEADER_FILE_NAME, HEADER_FILE_SIZE,
    HEADER_FINAL_UPLOAD, HEADER_TOTAL_CHUNKS, UPLOAD_PATH,
};
use teledrop_api::setup::{routes, services, storage};
use teledrop_api::state::AppState;
use teledrop_core::{BaseConfig, Config, KvBackend, RelayConfig};

/// Bot token used by every test; appears in mocked upstream paths.
pub const TEST_BOT_TOKEN: &str = "123:TEST";

/// Origin the relay believes it is served from.
pub const TEST_ORIGIN: &str = "http://relay.test";

/// Test application: server, mocked upstream and shared state.
pub struct TestApp {
    pub server: TestServer,
    pub telegram: mockito::ServerGuard,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Referer header value for a page on this site
    pub fn same_origin_referer(&self) -> String {
        format!("{}/gallery", TEST_ORIGIN)
    }
}

pub fn create_test_config(telegram_api_base: &str, auth_token: Option<&str>) -> Config {
    Config(Box::new(RelayConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
        },
        telegram_bot_token: TEST_BOT_TOKEN.to_string(),
        telegram_chat_id: "-1001".to_string(),
        telegram_api_base: telegram_api_base.to_string(),
        upstream_timeout_secs: 10,
        upstream_max_retries: 2,
        upstream_retry_base_ms: 10,
        kv_backend: KvBackend::Memory,
        chunk_store_path: None,
        metadata_store_path: None,
        chunk_ttl_secs: 3600,
        chunk_sweep_interval_secs: 0,
        allowed_origins: vec!["https://blog.example.org".to_string()],
        expect_referer: false,
        public_origin: Some(TEST_ORIGIN.to_string()),
        max_upload_size_bytes: 50 * 1024 * 1024,
        media_group_size: 10,
        auth_token: auth_token.map(String::from),
    }))
}

/// Setup a test app with memory namespaces and a fresh mock Bot API server.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_auth(None).await
}

pub async fn setup_test_app_with_auth(auth_token: Option<&str>) -> TestApp {
    let telegram = mockito::Server::new_async().await;
    let config = create_test_config(&telegram.url(), auth_token);

    let (chunks, metadata) = storage::setup_storage(&config)
        .await
        .expect("Failed to create namespaces");
    let state = services::initialize_services(&config, chunks, metadata)
        .await
        .expect("Failed to initialize services");
    let router = routes::setup_routes(&config, state.clone())
        .await
        .expect("Failed to build routes");

    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        telegram,
        state,
    }
}

/// PUT every chunk of `data`, returning the number of chunks sent.
pub async fn put_chunks(
    client: &TestServer,
    upload_id: &str,
    file_name: &str,
    data: &[u8],
    chunk_size: usize,
    skip: Option<usize>,
) -> usize {
    let chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
    let total = chunks.len();
    for (index, chunk) in chunks.into_iter().enumerate() {
        if skip == Some(index) {
            continue;
        }
        put_chunk(client, upload_id, file_name, data.len(), index, total, chunk).await;
    }
    total
}

pub async fn put_chunk(
    client: &TestServer,
    upload_id: &str,
    file_name: &str,
    file_size: usize,
    index: usize,
    total: usize,
    chunk: &[u8],
) {
    let response = client
        .put(UPLOAD_PATH)
        .add_header(HEADER_FILE_ID, upload_id.to_string())
        .add_header(HEADER_FILE_NAME, file_name.to_string())
        .add_header(HEADER_FILE_SIZE, file_size.to_string())
        .add_header(HEADER_CHUNK_INDEX, index.to_string())
        .add_header(HEADER_TOTAL_CHUNKS, total.to_string())
        .add_header("content-type", "application/octet-stream")
        .bytes(chunk.to_vec().into())
        .await;
    response.assert_status_ok();
}

pub async fn finalize(
    client: &TestServer,
    upload_id: &str,
    file_name: &str,
    file_size: usize,
    total: usize,
    mime: &str,
) -> axum_test::TestResponse {
    client
        .post(UPLOAD_PATH)
        .add_header(HEADER_FINAL_UPLOAD, "true")
        .add_header(HEADER_FILE_ID, upload_id.to_string())
        .add_header(HEADER_FILE_NAME, file_name.to_string())
        .add_header(HEADER_FILE_SIZE, file_size.to_string())
        .add_header(HEADER_TOTAL_CHUNKS, total.to_string())
        .add_header(HEADER_FILE_MIME_TYPE, mime.to_string())
        .await
}
