use std::{sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    app_error::AppResult,
    application::ports::{
        chat::ChatSender,
        store::{BotStats, StoreSession},
    },
};

#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastReport {
    pub sent: u32,
    pub failed: u32,
}

/// Read-only reporting plus best-effort broadcast.
pub struct AdminUseCases {
    sender: Arc<dyn ChatSender>,
    /// Pause between outbound messages so the transport's own rate limits
    /// are respected.
    broadcast_delay: Duration,
}

impl AdminUseCases {
    pub fn new(sender: Arc<dyn ChatSender>, broadcast_delay: Duration) -> Self {
        Self {
            sender,
            broadcast_delay,
        }
    }

    pub async fn stats(&self, session: &mut dyn StoreSession) -> AppResult<BotStats> {
        session.stats().await
    }

    /// Deliver `text` to every known user. A failure for one recipient
    /// (blocked bot, deleted account) is counted and logged, never fatal to
    /// the rest of the loop.
    pub async fn broadcast(
        &self,
        session: &mut dyn StoreSession,
        text: &str,
    ) -> AppResult<BroadcastReport> {
        let users = session.list_users().await?;
        let mut report = BroadcastReport::default();

        for user in &users {
            match self.sender.send_text(user.telegram_id, text).await {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        telegram_id = user.telegram_id,
                        error = %err,
                        "broadcast delivery failed"
                    );
                }
            }
            tokio::time::sleep(self.broadcast_delay).await;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::ports::store::BotStore,
        test_utils::{InMemoryStore, RecordingChatSender, profile},
    };

    #[tokio::test]
    async fn revenue_counts_success_payments_only() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();

        let alice = session.ensure_user(&profile(1)).await.unwrap();
        let bob = session.ensure_user(&profile(2)).await.unwrap();

        let paid = session
            .register_payment(alice.id, "plan-6m-1-1700000000", 2499, 2499)
            .await
            .unwrap();
        session.mark_payment_success(paid.id, 1).await.unwrap();

        let failed = session
            .register_payment(bob.id, "plan-1m-2-1700000001", 499, 499)
            .await
            .unwrap();
        session.mark_payment_failed(failed.id).await.unwrap();

        session
            .register_payment(bob.id, "plan-1m-2-1700000002", 499, 499)
            .await
            .unwrap();

        let sender = Arc::new(RecordingChatSender::new());
        let admin = AdminUseCases::new(sender, Duration::ZERO);
        let stats = admin.stats(session.as_mut()).await.unwrap();

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_revenue_stars, 2499);
    }

    #[tokio::test]
    async fn broadcast_survives_individual_failures() {
        let store = InMemoryStore::new();
        let mut session = store.session().await.unwrap();
        for id in [10, 20, 30] {
            session.ensure_user(&profile(id)).await.unwrap();
        }

        let sender = Arc::new(RecordingChatSender::failing_for(vec![20]));
        let admin = AdminUseCases::new(sender.clone(), Duration::ZERO);
        let report = admin
            .broadcast(session.as_mut(), "maintenance tonight")
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);

        let delivered = sender.delivered();
        assert_eq!(delivered.len(), 2);
        assert!(delivered.iter().all(|(_, text)| text == "maintenance tonight"));
        assert!(delivered.iter().any(|(id, _)| *id == 10));
        assert!(delivered.iter().any(|(id, _)| *id == 30));
    }
}
