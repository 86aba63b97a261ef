use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment::{Payment, PaymentStatus},
};

#[derive(sqlx::FromRow, Debug)]
struct PaymentRow {
    id: i64,
    user_id: i64,
    subscription_id: Option<i64>,
    invoice_payload: String,
    stars_amount: i32,
    fiat_amount: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = PaymentStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Database(format!("unknown payment status: {}", row.status)))?;
        Ok(Payment {
            id: row.id,
            user_id: row.user_id,
            subscription_id: row.subscription_id,
            invoice_payload: row.invoice_payload,
            stars_amount: row.stars_amount,
            fiat_amount: row.fiat_amount,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLS: &str = "id, user_id, subscription_id, invoice_payload, stars_amount, \
                           fiat_amount, status, created_at, updated_at";

pub(crate) async fn register_payment(
    conn: &mut PgConnection,
    user_id: i64,
    payload: &str,
    stars_amount: i32,
    fiat_amount: i32,
) -> AppResult<Payment> {
    let row: PaymentRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO payments (user_id, invoice_payload, stars_amount, fiat_amount, status)
        VALUES ($1, $2, $3, $4, 'pending')
        RETURNING {SELECT_COLS}
        "#
    ))
    .bind(user_id)
    .bind(payload)
    .bind(stars_amount)
    .bind(fiat_amount)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::from)?;

    row.try_into()
}

pub(crate) async fn payment_by_payload(
    conn: &mut PgConnection,
    payload: &str,
) -> AppResult<Option<Payment>> {
    let row: Option<PaymentRow> = sqlx::query_as(&format!(
        "SELECT {SELECT_COLS} FROM payments WHERE invoice_payload = $1"
    ))
    .bind(payload)
    .fetch_optional(&mut *conn)
    .await
    .map_err(AppError::from)?;

    row.map(Payment::try_from).transpose()
}

/// Guarded pending -> terminal transition: a row that already settled is
/// left untouched so a redelivered notification cannot rewrite history.
pub(crate) async fn mark_payment_success(
    conn: &mut PgConnection,
    payment_id: i64,
    subscription_id: i64,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'success', subscription_id = $2, updated_at = now()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(payment_id)
    .bind(subscription_id)
    .execute(&mut *conn)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        tracing::debug!(payment_id, "success transition skipped, payment not pending");
    }
    Ok(())
}

pub(crate) async fn mark_payment_failed(conn: &mut PgConnection, payment_id: i64) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'failed', updated_at = now()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(payment_id)
    .execute(&mut *conn)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        tracing::debug!(payment_id, "failed transition skipped, payment not pending");
    }
    Ok(())
}

pub(crate) async fn stars_revenue(conn: &mut PgConnection) -> AppResult<i64> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(stars_amount), 0) FROM payments WHERE status = 'success'",
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::from)
}
