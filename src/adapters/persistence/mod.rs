use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store::{BotStats, BotStore, NewSubscription, StoreSession},
    domain::entities::{
        payment::Payment,
        subscription::Subscription,
        user::{ChatProfile, User},
    },
};

pub mod payment;
pub mod subscription;
pub mod user;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BotStore for PgStore {
    async fn session(&self) -> AppResult<Box<dyn StoreSession>> {
        let tx = self.pool.begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgSession { tx }))
    }
}

/// One transaction per inbound chat event. Dropping the session without
/// `commit` rolls every write back.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreSession for PgSession {
    async fn ensure_user(&mut self, profile: &ChatProfile) -> AppResult<User> {
        user::ensure_user(&mut self.tx, profile).await
    }

    async fn register_payment(
        &mut self,
        user_id: i64,
        payload: &str,
        stars_amount: i32,
        fiat_amount: i32,
    ) -> AppResult<Payment> {
        payment::register_payment(&mut self.tx, user_id, payload, stars_amount, fiat_amount).await
    }

    async fn payment_by_payload(&mut self, payload: &str) -> AppResult<Option<Payment>> {
        payment::payment_by_payload(&mut self.tx, payload).await
    }

    async fn create_subscription(&mut self, new: NewSubscription<'_>) -> AppResult<Subscription> {
        subscription::create_subscription(&mut self.tx, &new).await
    }

    async fn active_subscription(&mut self, user_id: i64) -> AppResult<Option<Subscription>> {
        subscription::active_subscription(&mut self.tx, user_id).await
    }

    async fn mark_payment_success(
        &mut self,
        payment_id: i64,
        subscription_id: i64,
    ) -> AppResult<()> {
        payment::mark_payment_success(&mut self.tx, payment_id, subscription_id).await
    }

    async fn mark_payment_failed(&mut self, payment_id: i64) -> AppResult<()> {
        payment::mark_payment_failed(&mut self.tx, payment_id).await
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        user::list_users(&mut self.tx).await
    }

    async fn stats(&mut self) -> AppResult<BotStats> {
        let total_users = user::count_users(&mut self.tx).await?;
        let total_revenue_stars = payment::stars_revenue(&mut self.tx).await?;
        Ok(BotStats {
            total_users,
            total_revenue_stars,
        })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // PostgreSQL unique violation
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::InvalidInput("A record with this value already exists".into())
                }
                // PostgreSQL foreign key violation
                else if msg.contains("foreign key") || msg.contains("violates foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    // Log the actual error for debugging, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
