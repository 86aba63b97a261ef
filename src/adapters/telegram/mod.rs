use teloxide::{prelude::*, types::User as TelegramUser};
use tracing::{debug, info};

use crate::{app_error::AppError, domain::entities::user::ChatProfile};

pub mod handlers;
pub mod keyboards;
pub mod sender;
pub mod state;
pub mod texts;

pub use state::BotState;

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Delivery(err.to_string())
    }
}

pub(crate) fn chat_profile(user: &TelegramUser) -> ChatProfile {
    ChatProfile {
        telegram_id: user.id.0 as i64,
        username: user.username.clone(),
        full_name: Some(user.full_name()),
    }
}

pub async fn run_bot(bot: Bot, state: BotState) {
    info!("starting bot dispatcher");

    let mut dispatcher = Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![state])
        .default_handler(|upd: std::sync::Arc<Update>| async move {
            debug!(?upd, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build();

    dispatcher.dispatch().await;
}
