use chrono::Utc;
use secrecy::ExposeSecret;
use teloxide::{
    prelude::*,
    types::{ChatId, LabeledPrice, PreCheckoutQuery, SuccessfulPayment},
};
use tracing::error;

use crate::{
    app_error::AppResult,
    domain::entities::user::ChatProfile,
    use_cases::{
        billing::{self, PreCheckoutOutcome},
        provisioning::ConfirmationOutcome,
    },
};

use super::super::{BotState, chat_profile, texts};

/// Plan button pressed: record the pending payment, then send the invoice.
/// The payment row is committed before the invoice goes out; a stale pending
/// row from a failed send is harmless, an invoice without a row is not.
pub(super) async fn select_plan(
    bot: &Bot,
    q: &CallbackQuery,
    state: &BotState,
    months_raw: &str,
) -> AppResult<()> {
    let Ok(months) = months_raw.parse::<i32>() else {
        bot.answer_callback_query(q.id.clone())
            .text(texts::PLAN_NOT_FOUND)
            .show_alert(true)
            .await?;
        return Ok(());
    };

    let profile = chat_profile(&q.from);
    let mut session = state.store.session().await?;
    let order = billing::place_order(session.as_mut(), &profile, months, Utc::now()).await?;
    session.commit().await?;

    let Some(order) = order else {
        bot.answer_callback_query(q.id.clone())
            .text(texts::PLAN_NOT_FOUND)
            .show_alert(true)
            .await?;
        return Ok(());
    };

    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(profile.telegram_id));
    let prices = vec![LabeledPrice {
        label: texts::invoice_title(order.plan),
        amount: order.plan.price_stars as u32,
    }];

    let mut invoice = bot.send_invoice(
        chat_id,
        texts::invoice_title(order.plan),
        texts::INVOICE_DESCRIPTION,
        order.payload.clone(),
        "",
        "XTR",
        prices,
    );
    let provider_token = state.config.provider_token.expose_secret();
    if !provider_token.is_empty() {
        invoice = invoice.provider_token(provider_token.to_owned());
    }
    invoice.await?;

    bot.answer_callback_query(q.id.clone())
        .text(texts::INVOICE_SENT)
        .await?;
    Ok(())
}

/// Answered before the billing channel captures funds: approve only when the
/// plan resolves and the invoice was actually issued by this bot.
pub async fn pre_checkout(bot: Bot, q: PreCheckoutQuery, state: BotState) -> ResponseResult<()> {
    let outcome = validate(&state, &q.invoice_payload).await;
    match outcome {
        Ok(PreCheckoutOutcome::Approved) => {
            bot.answer_pre_checkout_query(q.id, true).await?;
        }
        Ok(PreCheckoutOutcome::UnknownPlan) => {
            bot.answer_pre_checkout_query(q.id, false)
                .error_message(texts::PLAN_NOT_FOUND_CHECKOUT)
                .await?;
        }
        Ok(PreCheckoutOutcome::MissingInvoice) => {
            bot.answer_pre_checkout_query(q.id, false)
                .error_message(texts::INVOICE_NOT_FOUND)
                .await?;
        }
        Ok(PreCheckoutOutcome::AlreadySettled) => {
            bot.answer_pre_checkout_query(q.id, false)
                .error_message(texts::INVOICE_ALREADY_USED)
                .await?;
        }
        Err(err) => {
            error!(error = %err, payload = %q.invoice_payload, "pre-checkout validation failed");
            bot.answer_pre_checkout_query(q.id, false)
                .error_message(texts::GENERIC_FAILURE)
                .await?;
        }
    }
    Ok(())
}

async fn validate(state: &BotState, payload: &str) -> AppResult<PreCheckoutOutcome> {
    let mut session = state.store.session().await?;
    let outcome = billing::validate_pre_checkout(session.as_mut(), payload).await?;
    session.commit().await?;
    Ok(outcome)
}

/// The confirmed-payment notification: the one place money turns into a key.
pub async fn successful_payment(
    bot: Bot,
    msg: Message,
    payment: SuccessfulPayment,
    state: BotState,
) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let profile = chat_profile(from);

    let outcome = confirm(&state, &profile, &payment.invoice_payload).await;
    let reply = match outcome {
        Ok(ConfirmationOutcome::Provisioned(sub)) => texts::provisioned(&sub),
        Ok(ConfirmationOutcome::AlreadySettled(status)) => texts::already_settled(status).to_owned(),
        Ok(ConfirmationOutcome::UnknownPlan) => texts::PLAN_NOT_FOUND_CHECKOUT.to_owned(),
        Ok(ConfirmationOutcome::MissingInvoice) => texts::INVOICE_RECORD_MISSING.to_owned(),
        Ok(ConfirmationOutcome::ProvisioningFailed) => texts::PROVISIONING_FAILED.to_owned(),
        Err(err) => {
            error!(error = %err, payload = %payment.invoice_payload, "payment confirmation failed");
            texts::GENERIC_FAILURE.to_owned()
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn confirm(
    state: &BotState,
    profile: &ChatProfile,
    payload: &str,
) -> AppResult<ConfirmationOutcome> {
    let mut session = state.store.session().await?;
    let outcome = state
        .provisioning
        .confirm_payment(session.as_mut(), profile, payload, Utc::now())
        .await?;
    // Committed on every outcome: a failed provisioning attempt must still
    // durably record the failed payment.
    session.commit().await?;
    Ok(outcome)
}
