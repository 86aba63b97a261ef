use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    app_error::AppResult,
    domain::entities::{
        payment::Payment,
        subscription::Subscription,
        user::{ChatProfile, User},
    },
};

#[derive(Debug, Clone)]
pub struct NewSubscription<'a> {
    pub user_id: i64,
    pub key_id: &'a str,
    pub access_url: &'a str,
    pub months: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct BotStats {
    pub total_users: i64,
    /// Sum of stars amounts over success-status payments only.
    pub total_revenue_stars: i64,
}

/// One unit of work, opened per inbound chat event and shared by all handler
/// logic for that event. Dropping a session without `commit` rolls back
/// every write made through it.
#[async_trait]
pub trait StoreSession: Send {
    /// Get-or-create by telegram id. Mutable profile fields are refreshed
    /// even when the row already exists.
    async fn ensure_user(&mut self, profile: &ChatProfile) -> AppResult<User>;

    /// Insert a pending payment tied to a fresh invoice payload.
    async fn register_payment(
        &mut self,
        user_id: i64,
        payload: &str,
        stars_amount: i32,
        fiat_amount: i32,
    ) -> AppResult<Payment>;

    async fn payment_by_payload(&mut self, payload: &str) -> AppResult<Option<Payment>>;

    async fn create_subscription(&mut self, new: NewSubscription<'_>) -> AppResult<Subscription>;

    /// Most recent non-expired subscription, or `None` when the user is
    /// unprotected regardless of history.
    async fn active_subscription(&mut self, user_id: i64) -> AppResult<Option<Subscription>>;

    /// pending -> success, linking the funded subscription. A terminal row
    /// is left untouched.
    async fn mark_payment_success(&mut self, payment_id: i64, subscription_id: i64)
    -> AppResult<()>;

    /// pending -> failed. A terminal row is left untouched.
    async fn mark_payment_failed(&mut self, payment_id: i64) -> AppResult<()>;

    async fn list_users(&mut self) -> AppResult<Vec<User>>;

    async fn stats(&mut self) -> AppResult<BotStats>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait BotStore: Send + Sync {
    async fn session(&self) -> AppResult<Box<dyn StoreSession>>;
}
