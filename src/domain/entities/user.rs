use chrono::{DateTime, Utc};

/// Identity and profile fields as delivered by the chat transport.
///
/// The telegram id is the external identity anchor; the profile fields are
/// refreshed on every interaction.
#[derive(Debug, Clone)]
pub struct ChatProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
