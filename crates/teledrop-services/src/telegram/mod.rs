//! Telegram Bot API client used as the blob store

pub mod client;
pub mod retry;
pub mod types;

pub use client::TelegramClient;
pub use retry::{send_with_retry, RetryPolicy, UpstreamError, IMAGE_PROCESS_FAILED};
pub use types::{ApiResponse, FileAttachment, Message, PhotoSize, SentMedia, TgFile};
