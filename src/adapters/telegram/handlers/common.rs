use chrono::Utc;
use teloxide::{prelude::*, types::ChatId};
use tracing::error;

use crate::{app_error::AppResult, domain::entities::user::ChatProfile, use_cases::billing};

use super::super::{BotState, chat_profile, keyboards, texts};
use super::{Command, admin, payments};

pub async fn command(bot: Bot, msg: Message, cmd: Command, state: BotState) -> ResponseResult<()> {
    let result = match cmd {
        Command::Start => start(&bot, &msg, &state).await,
        Command::MySubscription => my_subscription(&bot, &msg, &state).await,
        Command::Admin => admin::dashboard(&bot, &msg, &state).await,
        Command::Broadcast(text) => admin::broadcast(&bot, &msg, &state, text.trim()).await,
    };

    if let Err(err) = result {
        error!(error = %err, "command handler failed");
        let _ = bot.send_message(msg.chat.id, texts::GENERIC_FAILURE).await;
    }
    Ok(())
}

async fn start(bot: &Bot, msg: &Message, state: &BotState) -> AppResult<()> {
    bot.send_message(msg.chat.id, texts::WELCOME)
        .reply_markup(keyboards::main_menu(&state.config.support_url))
        .await?;
    Ok(())
}

async fn my_subscription(bot: &Bot, msg: &Message, state: &BotState) -> AppResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    reply_subscription(bot, msg.chat.id, state, &chat_profile(from)).await
}

/// Shared by the command and the menu button.
async fn reply_subscription(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    profile: &ChatProfile,
) -> AppResult<()> {
    let mut session = state.store.session().await?;
    let subscription = billing::active_subscription_for(session.as_mut(), profile).await?;
    session.commit().await?;

    match subscription {
        Some(sub) => {
            bot.send_message(chat_id, texts::subscription_summary(&sub, Utc::now()))
                .reply_markup(keyboards::renew())
                .await?;
        }
        None => {
            bot.send_message(chat_id, texts::NO_SUBSCRIPTION)
                .reply_markup(keyboards::plans())
                .await?;
        }
    }
    Ok(())
}

pub async fn callback(bot: Bot, q: CallbackQuery, state: BotState) -> ResponseResult<()> {
    if let Err(err) = dispatch_callback(&bot, &q, &state).await {
        error!(error = %err, data = ?q.data, "callback handler failed");
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(texts::GENERIC_FAILURE)
            .await;
    }
    Ok(())
}

async fn dispatch_callback(bot: &Bot, q: &CallbackQuery, state: &BotState) -> AppResult<()> {
    match q.data.as_deref() {
        Some("plans") => show_plans(bot, q).await,
        Some("back_main") => back_to_main(bot, q, state).await,
        Some("my_subscription") => my_subscription_cb(bot, q, state).await,
        Some(data) if data.starts_with("plan:") => {
            payments::select_plan(bot, q, state, &data["plan:".len()..]).await
        }
        _ => {
            bot.answer_callback_query(q.id.clone()).await?;
            Ok(())
        }
    }
}

async fn show_plans(bot: &Bot, q: &CallbackQuery) -> AppResult<()> {
    if let Some(message) = q.message.as_ref() {
        bot.edit_message_text(message.chat().id, message.id(), texts::plan_list())
            .reply_markup(keyboards::plans())
            .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn back_to_main(bot: &Bot, q: &CallbackQuery, state: &BotState) -> AppResult<()> {
    if let Some(message) = q.message.as_ref() {
        bot.edit_message_text(message.chat().id, message.id(), texts::MENU)
            .reply_markup(keyboards::main_menu(&state.config.support_url))
            .await?;
    }
    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

async fn my_subscription_cb(bot: &Bot, q: &CallbackQuery, state: &BotState) -> AppResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    let profile = chat_profile(&q.from);
    reply_subscription(bot, ChatId(profile.telegram_id), state, &profile).await
}
