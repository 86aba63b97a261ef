use chrono::{DateTime, Duration, Utc};

/// A time-bounded grant of VPN access backed by one external key.
///
/// `expires_at` is set once at creation and never mutated; a renewal is a new
/// row, not an extension of this one.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    /// External credential id, unique across all subscriptions.
    pub key_id: String,
    /// Opaque connection string returned by the key server.
    pub access_url: String,
    pub months: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }
}

/// Fixed-width month approximation, not calendar-accurate.
pub fn expiry_from(now: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    now + Duration::days(30 * months as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_uses_thirty_day_months() {
        let now = Utc::now();
        assert_eq!(expiry_from(now, 6), now + Duration::days(180));
        assert_eq!(expiry_from(now, 1), now + Duration::days(30));
    }

    #[test]
    fn days_left_clamps_at_zero() {
        let now = Utc::now();
        let sub = Subscription {
            id: 1,
            user_id: 1,
            key_id: "k1".into(),
            access_url: "ss://example".into(),
            months: 1,
            expires_at: now - Duration::days(3),
            created_at: now - Duration::days(33),
        };
        assert_eq!(sub.days_left(now), 0);
    }
}
