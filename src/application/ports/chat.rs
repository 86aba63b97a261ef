use async_trait::async_trait;

use crate::app_error::AppResult;

/// Outbound text delivery to a chat user, independent of the transport.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_text(&self, telegram_id: i64, text: &str) -> AppResult<()>;
}
