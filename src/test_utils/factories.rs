use crate::domain::entities::user::ChatProfile;

pub fn profile(telegram_id: i64) -> ChatProfile {
    ChatProfile {
        telegram_id,
        username: Some(format!("user{telegram_id}")),
        full_name: Some("Test User".to_string()),
    }
}
