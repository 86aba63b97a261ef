use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::user::{ChatProfile, User},
};

// User struct as stored in the db.
#[derive(sqlx::FromRow, Debug)]
struct UserRow {
    id: i64,
    telegram_id: i64,
    username: Option<String>,
    full_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            telegram_id: row.telegram_id,
            username: row.username,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLS: &str = "id, telegram_id, username, full_name, created_at";

pub(crate) async fn ensure_user(conn: &mut PgConnection, profile: &ChatProfile) -> AppResult<User> {
    let row: UserRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (telegram_id, username, full_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (telegram_id) DO UPDATE
        SET username = EXCLUDED.username, full_name = EXCLUDED.full_name
        RETURNING {SELECT_COLS}
        "#
    ))
    .bind(profile.telegram_id)
    .bind(&profile.username)
    .bind(&profile.full_name)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::from)?;

    Ok(row.into())
}

pub(crate) async fn list_users(conn: &mut PgConnection) -> AppResult<Vec<User>> {
    let rows: Vec<UserRow> =
        sqlx::query_as(&format!("SELECT {SELECT_COLS} FROM users ORDER BY id"))
            .fetch_all(&mut *conn)
            .await
            .map_err(AppError::from)?;

    Ok(rows.into_iter().map(User::from).collect())
}

pub(crate) async fn count_users(conn: &mut PgConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await
        .map_err(AppError::from)
}
