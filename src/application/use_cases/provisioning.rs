use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    app_error::AppResult,
    application::ports::{
        store::{NewSubscription, StoreSession},
        vpn::VpnKeyService,
    },
    domain::entities::{
        payment::PaymentStatus,
        plan,
        subscription::{self, Subscription},
        user::ChatProfile,
    },
};

/// How a confirmed-payment notification was resolved. Every variant maps to
/// one distinct user-facing reply in the transport adapter.
#[derive(Debug)]
pub enum ConfirmationOutcome {
    /// Key minted, subscription recorded, payment settled.
    Provisioned(Subscription),
    /// The payment already reached a terminal status; nothing was done.
    AlreadySettled(PaymentStatus),
    /// The payload resolves to no catalog plan.
    UnknownPlan,
    /// Confirmed payment with no issued invoice behind it. The billing
    /// channel captured funds for an invoice this bot never recorded.
    MissingInvoice,
    /// The key server call failed; the payment is now marked failed and the
    /// captured funds need manual reconciliation.
    ProvisioningFailed,
}

/// The payment -> credential -> subscription transition.
pub struct ProvisioningUseCases {
    keys: Arc<dyn VpnKeyService>,
}

impl ProvisioningUseCases {
    pub fn new(keys: Arc<dyn VpnKeyService>) -> Self {
        Self { keys }
    }

    /// Convert one confirmed external payment into exactly one subscription
    /// row and one external key.
    ///
    /// Re-delivery of the same notification short-circuits on the payment's
    /// terminal status before any key-server call; that check, not mutual
    /// exclusion, is what keeps the transition idempotent under interleaved
    /// events.
    #[tracing::instrument(skip(self, session, profile))]
    pub async fn confirm_payment(
        &self,
        session: &mut dyn StoreSession,
        profile: &ChatProfile,
        payload: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ConfirmationOutcome> {
        let Some(plan) = plan::by_payload(payload) else {
            warn!(payload, "confirmed payment carries an unresolvable plan");
            return Ok(ConfirmationOutcome::UnknownPlan);
        };

        let user = session.ensure_user(profile).await?;
        let Some(payment) = session.payment_by_payload(payload).await? else {
            error!(
                payload,
                telegram_id = user.telegram_id,
                "confirmed payment has no invoice record; issuance was skipped somewhere"
            );
            return Ok(ConfirmationOutcome::MissingInvoice);
        };

        if payment.status.is_terminal() {
            info!(
                payload,
                status = payment.status.as_str(),
                "payment already settled, skipping provisioning"
            );
            return Ok(ConfirmationOutcome::AlreadySettled(payment.status));
        }

        let label = format!("tg-{}", user.telegram_id);
        let key = match self.keys.create_key(&label).await {
            Ok(key) => key,
            Err(err) => {
                // Funds are captured but no key exists. Mark the payment
                // failed and leave the rest to manual reconciliation; the
                // key server call is never retried.
                session.mark_payment_failed(payment.id).await?;
                error!(payload, error = %err, "key creation failed, payment marked failed");
                return Ok(ConfirmationOutcome::ProvisioningFailed);
            }
        };

        let sub = session
            .create_subscription(NewSubscription {
                user_id: user.id,
                key_id: &key.id,
                access_url: &key.access_url,
                months: plan.months,
                expires_at: subscription::expiry_from(now, plan.months),
            })
            .await?;
        session.mark_payment_success(payment.id, sub.id).await?;
        info!(payload, subscription_id = sub.id, key_id = %sub.key_id, "subscription provisioned");

        Ok(ConfirmationOutcome::Provisioned(sub))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        application::ports::store::BotStore,
        test_utils::{InMemoryStore, MockVpnKeyService, profile},
        use_cases::billing,
    };

    async fn issue_invoice(store: &InMemoryStore, telegram_id: i64, months: i32) -> String {
        let mut session = store.session().await.unwrap();
        let order = billing::place_order(session.as_mut(), &profile(telegram_id), months, Utc::now())
            .await
            .unwrap()
            .unwrap();
        session.commit().await.unwrap();
        order.payload
    }

    #[tokio::test]
    async fn successful_confirmation_links_payment_and_subscription() {
        let store = InMemoryStore::new();
        let keys = Arc::new(MockVpnKeyService::succeeding());
        let provisioning = ProvisioningUseCases::new(keys.clone());
        let payload = issue_invoice(&store, 555, 6).await;
        let now = Utc::now();

        let mut session = store.session().await.unwrap();
        let outcome = provisioning
            .confirm_payment(session.as_mut(), &profile(555), &payload, now)
            .await
            .unwrap();

        let sub = match outcome {
            ConfirmationOutcome::Provisioned(sub) => sub,
            other => panic!("expected a provisioned subscription, got {other:?}"),
        };
        assert_eq!(sub.months, 6);
        assert_eq!(sub.expires_at, now + Duration::days(180));
        assert_eq!(sub.key_id, "k1");
        assert!(sub.access_url.starts_with("ss://"));

        let payment = session
            .payment_by_payload(&payload)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.subscription_id, Some(sub.id));
        assert_eq!(keys.calls(), 1);
    }

    #[tokio::test]
    async fn redelivered_confirmation_provisions_nothing_twice() {
        let store = InMemoryStore::new();
        let keys = Arc::new(MockVpnKeyService::succeeding());
        let provisioning = ProvisioningUseCases::new(keys.clone());
        let payload = issue_invoice(&store, 555, 1).await;

        for round in 0..2 {
            let mut session = store.session().await.unwrap();
            let outcome = provisioning
                .confirm_payment(session.as_mut(), &profile(555), &payload, Utc::now())
                .await
                .unwrap();
            session.commit().await.unwrap();
            match (round, outcome) {
                (0, ConfirmationOutcome::Provisioned(_)) => {}
                (1, ConfirmationOutcome::AlreadySettled(PaymentStatus::Success)) => {}
                (_, other) => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(store.subscription_count(), 1);
        assert_eq!(keys.calls(), 1);
    }

    #[tokio::test]
    async fn key_server_failure_fails_payment_and_grants_nothing() {
        let store = InMemoryStore::new();
        let keys = Arc::new(MockVpnKeyService::failing());
        let provisioning = ProvisioningUseCases::new(keys.clone());
        let payload = issue_invoice(&store, 555, 6).await;

        let mut session = store.session().await.unwrap();
        let outcome = provisioning
            .confirm_payment(session.as_mut(), &profile(555), &payload, Utc::now())
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert!(matches!(outcome, ConfirmationOutcome::ProvisioningFailed));
        assert_eq!(store.subscription_count(), 0);

        let mut session = store.session().await.unwrap();
        let payment = session
            .payment_by_payload(&payload)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.subscription_id, None);

        // A redelivered notification must not reach the key server either.
        let outcome = provisioning
            .confirm_payment(session.as_mut(), &profile(555), &payload, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ConfirmationOutcome::AlreadySettled(PaymentStatus::Failed)
        ));
        assert_eq!(keys.calls(), 1);
    }

    #[tokio::test]
    async fn unresolvable_plan_aborts_before_any_write() {
        let store = InMemoryStore::new();
        let keys = Arc::new(MockVpnKeyService::succeeding());
        let provisioning = ProvisioningUseCases::new(keys.clone());

        let mut session = store.session().await.unwrap();
        let outcome = provisioning
            .confirm_payment(
                session.as_mut(),
                &profile(555),
                "plan-7m-555-1700000000",
                Utc::now(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, ConfirmationOutcome::UnknownPlan));
        assert_eq!(keys.calls(), 0);
        assert_eq!(store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn confirmation_without_issued_invoice_is_a_consistency_fault() {
        let store = InMemoryStore::new();
        let keys = Arc::new(MockVpnKeyService::succeeding());
        let provisioning = ProvisioningUseCases::new(keys.clone());

        let mut session = store.session().await.unwrap();
        let outcome = provisioning
            .confirm_payment(
                session.as_mut(),
                &profile(555),
                "plan-6m-555-1700000000",
                Utc::now(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, ConfirmationOutcome::MissingInvoice));
        assert_eq!(keys.calls(), 0);
        assert_eq!(store.subscription_count(), 0);
    }
}
