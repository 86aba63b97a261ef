use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};

use super::{BotState, texts};

pub mod admin;
pub mod common;
pub mod payments;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Comet VPN commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show your active subscription")]
    MySubscription,
    #[command(description = "operator dashboard")]
    Admin,
    #[command(description = "operator broadcast")]
    Broadcast(String),
}

/// Admission first, then routing. Pre-checkout queries bypass the rate
/// limiter: they are read-only and must be answered within Telegram's
/// deadline or the purchase dies.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    let messages = Update::filter_message()
        .filter_async(admit_message)
        .branch(
            dptree::filter_map(|msg: Message| msg.successful_payment().cloned())
                .endpoint(payments::successful_payment),
        )
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(common::command),
        );

    let callbacks = Update::filter_callback_query()
        .filter_async(admit_callback)
        .endpoint(common::callback);

    let pre_checkout = Update::filter_pre_checkout_query().endpoint(payments::pre_checkout);

    dptree::entry()
        .branch(messages)
        .branch(callbacks)
        .branch(pre_checkout)
}

async fn admit_message(bot: Bot, msg: Message, state: BotState) -> bool {
    let Some(from) = msg.from.as_ref() else {
        // No sender to key the window on (channel posts etc); let routing decide.
        return true;
    };
    if state.rate_limiter.admit(from.id.0 as i64) {
        return true;
    }
    let _ = bot.send_message(msg.chat.id, texts::RATE_LIMITED).await;
    false
}

async fn admit_callback(bot: Bot, q: CallbackQuery, state: BotState) -> bool {
    if state.rate_limiter.admit(q.from.id.0 as i64) {
        return true;
    }
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text(texts::RATE_LIMITED)
        .await;
    false
}
