use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::store::NewSubscription,
    domain::entities::subscription::Subscription,
};

#[derive(sqlx::FromRow, Debug)]
struct SubscriptionRow {
    id: i64,
    user_id: i64,
    key_id: String,
    access_url: String,
    months: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            user_id: row.user_id,
            key_id: row.key_id,
            access_url: row.access_url,
            months: row.months,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLS: &str = "id, user_id, key_id, access_url, months, expires_at, created_at";

pub(crate) async fn create_subscription(
    conn: &mut PgConnection,
    new: &NewSubscription<'_>,
) -> AppResult<Subscription> {
    let row: SubscriptionRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO subscriptions (user_id, key_id, access_url, months, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {SELECT_COLS}
        "#
    ))
    .bind(new.user_id)
    .bind(new.key_id)
    .bind(new.access_url)
    .bind(new.months)
    .bind(new.expires_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::from)?;

    Ok(row.into())
}

/// Most recent qualifying expiry wins; an expired history leaves the user
/// unprotected.
pub(crate) async fn active_subscription(
    conn: &mut PgConnection,
    user_id: i64,
) -> AppResult<Option<Subscription>> {
    let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
        r#"
        SELECT {SELECT_COLS} FROM subscriptions
        WHERE user_id = $1 AND expires_at >= now()
        ORDER BY expires_at DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::from)?;

    Ok(row.map(Subscription::from))
}
