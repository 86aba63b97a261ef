use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};

use crate::{app_error::AppResult, application::ports::chat::ChatSender};

/// Outbound delivery through the bot API, used by the broadcast loop.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    async fn send_text(&self, telegram_id: i64, text: &str) -> AppResult<()> {
        self.bot
            .send_message(ChatId(telegram_id), text)
            .await
            .map(|_| ())
            .map_err(Into::into)
    }
}
