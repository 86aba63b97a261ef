use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    app_error::AppResult,
    application::ports::store::StoreSession,
    domain::entities::{
        plan::{self, Plan},
        subscription::Subscription,
        user::ChatProfile,
    },
};

/// A pending invoice: the plan the user picked and the payload that will
/// correlate pre-checkout and payment confirmation back to it.
#[derive(Debug)]
pub struct PlacedOrder {
    pub plan: &'static Plan,
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreCheckoutOutcome {
    Approved,
    UnknownPlan,
    /// The invoice was paid for a payload this bot never issued. Funds must
    /// not be captured.
    MissingInvoice,
    /// The invoice already reached a terminal payment; paying it again would
    /// capture funds for a settled order.
    AlreadySettled,
}

/// Resolve the chosen plan and record a pending payment under a fresh
/// payload. Returns `None` when the duration matches no catalog entry; the
/// caller must surface that, never default to a plan.
pub async fn place_order(
    session: &mut dyn StoreSession,
    profile: &ChatProfile,
    months: i32,
    now: DateTime<Utc>,
) -> AppResult<Option<PlacedOrder>> {
    let Some(plan) = plan::by_months(months) else {
        warn!(months, "plan selection for unknown duration");
        return Ok(None);
    };

    let user = session.ensure_user(profile).await?;
    let payload = plan::invoice_payload(plan, user.telegram_id, now);
    session
        .register_payment(user.id, &payload, plan.price_stars, plan.price_rub)
        .await?;
    info!(payload = %payload, months = plan.months, "invoice issued");

    Ok(Some(PlacedOrder { plan, payload }))
}

/// Answer a pre-checkout query before the billing channel captures funds.
/// Issuance must precede confirmation: a missing payment row is rejected,
/// never created reactively.
pub async fn validate_pre_checkout(
    session: &mut dyn StoreSession,
    payload: &str,
) -> AppResult<PreCheckoutOutcome> {
    if plan::by_payload(payload).is_none() {
        warn!(payload, "pre-checkout for unknown plan");
        return Ok(PreCheckoutOutcome::UnknownPlan);
    }

    match session.payment_by_payload(payload).await? {
        Some(payment) if payment.status.is_terminal() => {
            warn!(
                payload,
                status = payment.status.as_str(),
                "pre-checkout for an already settled invoice"
            );
            Ok(PreCheckoutOutcome::AlreadySettled)
        }
        Some(_) => Ok(PreCheckoutOutcome::Approved),
        None => {
            warn!(payload, "pre-checkout with no issued invoice");
            Ok(PreCheckoutOutcome::MissingInvoice)
        }
    }
}

pub async fn active_subscription_for(
    session: &mut dyn StoreSession,
    profile: &ChatProfile,
) -> AppResult<Option<Subscription>> {
    let user = session.ensure_user(profile).await?;
    session.active_subscription(user.id).await
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        application::ports::store::{BotStore, NewSubscription},
        domain::entities::{payment::PaymentStatus, subscription::expiry_from},
        test_utils::{InMemoryStore, profile},
    };

    #[tokio::test]
    async fn place_order_registers_pending_payment() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let order = place_order(session.as_mut(), &profile(555), 6, Utc::now())
            .await
            .unwrap()
            .expect("known plan");

        assert_eq!(order.plan.months, 6);
        assert!(order.payload.starts_with("plan-6m-555-"));

        let payment = session
            .payment_by_payload(&order.payload)
            .await
            .unwrap()
            .expect("payment row registered at issuance time");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.stars_amount, 2499);
        assert_eq!(payment.fiat_amount, 2499);
        assert_eq!(payment.subscription_id, None);
    }

    #[tokio::test]
    async fn place_order_rejects_unknown_duration() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let order = place_order(session.as_mut(), &profile(555), 7, Utc::now())
            .await
            .unwrap();
        assert!(order.is_none());
        assert_eq!(store.payment_count(), 0);
    }

    #[tokio::test]
    async fn pre_checkout_rejects_unissued_invoice() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let outcome = validate_pre_checkout(session.as_mut(), "plan-6m-555-1700000000")
            .await
            .unwrap();
        assert_eq!(outcome, PreCheckoutOutcome::MissingInvoice);
    }

    #[tokio::test]
    async fn pre_checkout_rejects_unknown_plan() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let outcome = validate_pre_checkout(session.as_mut(), "plan-7m-555-1700000000")
            .await
            .unwrap();
        assert_eq!(outcome, PreCheckoutOutcome::UnknownPlan);
    }

    #[tokio::test]
    async fn pre_checkout_approves_issued_invoice() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let order = place_order(session.as_mut(), &profile(555), 6, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let outcome = validate_pre_checkout(session.as_mut(), &order.payload)
            .await
            .unwrap();
        assert_eq!(outcome, PreCheckoutOutcome::Approved);
    }

    #[tokio::test]
    async fn pre_checkout_rejects_settled_invoice() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let order = place_order(session.as_mut(), &profile(555), 1, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let payment = session
            .payment_by_payload(&order.payload)
            .await
            .unwrap()
            .unwrap();
        session.mark_payment_failed(payment.id).await.unwrap();

        let outcome = validate_pre_checkout(session.as_mut(), &order.payload)
            .await
            .unwrap();
        assert_eq!(outcome, PreCheckoutOutcome::AlreadySettled);
    }

    #[tokio::test]
    async fn active_subscription_picks_latest_qualifying_expiry() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();
        let user = session.ensure_user(&profile(555)).await.unwrap();
        let now = Utc::now();

        for (key, offset) in [("k1", -1), ("k2", 10), ("k3", 5)] {
            session
                .create_subscription(NewSubscription {
                    user_id: user.id,
                    key_id: key,
                    access_url: "ss://example",
                    months: 1,
                    expires_at: now + Duration::days(offset),
                })
                .await
                .unwrap();
        }

        let active = active_subscription_for(session.as_mut(), &profile(555))
            .await
            .unwrap()
            .expect("two rows still qualify");
        assert_eq!(active.key_id, "k2");
        assert_eq!(active.expires_at, now + Duration::days(10));
    }

    #[tokio::test]
    async fn all_expired_means_unprotected() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();
        let user = session.ensure_user(&profile(555)).await.unwrap();
        let now = Utc::now();

        session
            .create_subscription(NewSubscription {
                user_id: user.id,
                key_id: "k1",
                access_url: "ss://example",
                months: 12,
                expires_at: expiry_from(now - Duration::days(400), 12),
            })
            .await
            .unwrap();

        let active = active_subscription_for(session.as_mut(), &profile(555))
            .await
            .unwrap();
        assert!(active.is_none());
    }
}
