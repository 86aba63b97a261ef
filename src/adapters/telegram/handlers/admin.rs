use teloxide::prelude::*;

use crate::app_error::AppResult;

use super::super::{BotState, texts};

pub(super) async fn dashboard(bot: &Bot, msg: &Message, state: &BotState) -> AppResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.is_admin(from.id.0 as i64) {
        bot.send_message(msg.chat.id, texts::NOT_ADMIN).await?;
        return Ok(());
    }

    let mut session = state.store.session().await?;
    let stats = state.admin.stats(session.as_mut()).await?;
    session.commit().await?;

    bot.send_message(msg.chat.id, texts::stats(&stats)).await?;
    Ok(())
}

pub(super) async fn broadcast(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    text: &str,
) -> AppResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    if !state.is_admin(from.id.0 as i64) {
        bot.send_message(msg.chat.id, texts::NOT_ADMIN).await?;
        return Ok(());
    }
    if text.is_empty() {
        bot.send_message(msg.chat.id, texts::BROADCAST_USAGE).await?;
        return Ok(());
    }

    let mut session = state.store.session().await?;
    let report = state.admin.broadcast(session.as_mut(), text).await?;
    session.commit().await?;

    bot.send_message(msg.chat.id, texts::broadcast_report(&report))
        .await?;
    Ok(())
}
