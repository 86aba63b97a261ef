use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Per-user sliding-window admission control for chat-triggered writes.
///
/// State lives in process memory only; a restart resets every window. One
/// mutex serializes the read-modify-write of a user's timestamp list so
/// concurrent events from the same user cannot race past the limit check.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    slots: Mutex<HashMap<i64, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when the user already spent their admissions for the
    /// current window. An admitted event is recorded immediately.
    pub fn admit(&self, telegram_id: i64) -> bool {
        self.admit_at(telegram_id, Instant::now())
    }

    fn admit_at(&self, telegram_id: i64, now: Instant) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let stamps = slots.entry(telegram_id).or_default();
        // An event exactly `window` old has slid out of the window.
        stamps.retain(|t| now.duration_since(*t) < self.window);
        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn sixth_event_within_window_is_rejected() {
        let limiter = RateLimiter::new(5, WINDOW);
        let base = Instant::now();

        for i in 0..5 {
            assert!(limiter.admit_at(555, base + Duration::from_secs(i)));
        }
        assert!(!limiter.admit_at(555, base + Duration::from_secs(10)));
    }

    #[test]
    fn window_slides_after_exactly_sixty_seconds() {
        let limiter = RateLimiter::new(5, WINDOW);
        let base = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at(555, base));
        }
        assert!(!limiter.admit_at(555, base + Duration::from_secs(59)));
        // The first counted event no longer counts once 60s have elapsed.
        assert!(limiter.admit_at(555, base + WINDOW));
    }

    #[test]
    fn users_have_independent_windows() {
        let limiter = RateLimiter::new(1, WINDOW);
        let base = Instant::now();

        assert!(limiter.admit_at(1, base));
        assert!(limiter.admit_at(2, base));
        assert!(!limiter.admit_at(1, base));
    }

    #[test]
    fn rejected_events_are_not_counted() {
        let limiter = RateLimiter::new(2, WINDOW);
        let base = Instant::now();

        assert!(limiter.admit_at(555, base));
        assert!(limiter.admit_at(555, base + Duration::from_secs(1)));
        assert!(!limiter.admit_at(555, base + Duration::from_secs(2)));
        // Both admissions expire; the rejection above must not extend the window.
        assert!(limiter.admit_at(555, base + Duration::from_secs(61)));
        assert!(limiter.admit_at(555, base + Duration::from_secs(61)));
    }
}
