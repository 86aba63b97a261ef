//! In-memory implementations of the application ports, mirroring the SQL
//! adapter's semantics (uniqueness, guarded status transitions, active
//! subscription selection).

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        chat::ChatSender,
        store::{BotStats, BotStore, NewSubscription, StoreSession},
        vpn::{VpnKey, VpnKeyService},
    },
    domain::entities::{
        payment::{Payment, PaymentStatus},
        subscription::Subscription,
        user::{ChatProfile, User},
    },
};

// ============================================================================
// InMemoryStore
// ============================================================================

#[derive(Default)]
struct StoreData {
    users: Vec<User>,
    subscriptions: Vec<Subscription>,
    payments: Vec<Payment>,
}

/// Write-through store: sessions share the same state and `commit` is a
/// no-op. Rollback fidelity belongs to the SQL adapter, not to these tests.
#[derive(Default)]
pub struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_count(&self) -> usize {
        self.data.lock().unwrap().subscriptions.len()
    }

    pub fn payment_count(&self) -> usize {
        self.data.lock().unwrap().payments.len()
    }
}

#[async_trait]
impl BotStore for InMemoryStore {
    async fn session(&self) -> AppResult<Box<dyn StoreSession>> {
        Ok(Box::new(InMemorySession {
            data: self.data.clone(),
        }))
    }
}

pub struct InMemorySession {
    data: Arc<Mutex<StoreData>>,
}

#[async_trait]
impl StoreSession for InMemorySession {
    async fn ensure_user(&mut self, profile: &ChatProfile) -> AppResult<User> {
        let mut data = self.data.lock().unwrap();
        if let Some(user) = data
            .users
            .iter_mut()
            .find(|u| u.telegram_id == profile.telegram_id)
        {
            user.username = profile.username.clone();
            user.full_name = profile.full_name.clone();
            return Ok(user.clone());
        }

        let user = User {
            id: data.users.len() as i64 + 1,
            telegram_id: profile.telegram_id,
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            created_at: Utc::now(),
        };
        data.users.push(user.clone());
        Ok(user)
    }

    async fn register_payment(
        &mut self,
        user_id: i64,
        payload: &str,
        stars_amount: i32,
        fiat_amount: i32,
    ) -> AppResult<Payment> {
        let mut data = self.data.lock().unwrap();
        if data.payments.iter().any(|p| p.invoice_payload == payload) {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let now = Utc::now();
        let payment = Payment {
            id: data.payments.len() as i64 + 1,
            user_id,
            subscription_id: None,
            invoice_payload: payload.to_string(),
            stars_amount,
            fiat_amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        data.payments.push(payment.clone());
        Ok(payment)
    }

    async fn payment_by_payload(&mut self, payload: &str) -> AppResult<Option<Payment>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .payments
            .iter()
            .find(|p| p.invoice_payload == payload)
            .cloned())
    }

    async fn create_subscription(&mut self, new: NewSubscription<'_>) -> AppResult<Subscription> {
        let mut data = self.data.lock().unwrap();
        if data.subscriptions.iter().any(|s| s.key_id == new.key_id) {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }

        let sub = Subscription {
            id: data.subscriptions.len() as i64 + 1,
            user_id: new.user_id,
            key_id: new.key_id.to_string(),
            access_url: new.access_url.to_string(),
            months: new.months,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        data.subscriptions.push(sub.clone());
        Ok(sub)
    }

    async fn active_subscription(&mut self, user_id: i64) -> AppResult<Option<Subscription>> {
        let now = Utc::now();
        let data = self.data.lock().unwrap();
        Ok(data
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.expires_at >= now)
            .max_by_key(|s| s.expires_at)
            .cloned())
    }

    async fn mark_payment_success(
        &mut self,
        payment_id: i64,
        subscription_id: i64,
    ) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(payment) = data
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.status == PaymentStatus::Pending)
        {
            payment.status = PaymentStatus::Success;
            payment.subscription_id = Some(subscription_id);
            payment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_payment_failed(&mut self, payment_id: i64) -> AppResult<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(payment) = data
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.status == PaymentStatus::Pending)
        {
            payment.status = PaymentStatus::Failed;
            payment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        Ok(self.data.lock().unwrap().users.clone())
    }

    async fn stats(&mut self) -> AppResult<BotStats> {
        let data = self.data.lock().unwrap();
        let total_revenue_stars = data
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Success)
            .map(|p| p.stars_amount as i64)
            .sum();
        Ok(BotStats {
            total_users: data.users.len() as i64,
            total_revenue_stars,
        })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

// ============================================================================
// MockVpnKeyService
// ============================================================================

pub struct MockVpnKeyService {
    calls: AtomicUsize,
    fail: bool,
}

impl MockVpnKeyService {
    pub fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VpnKeyService for MockVpnKeyService {
    async fn create_key(&self, label: &str) -> AppResult<VpnKey> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(AppError::Provisioning(
                "key server request failed: connection timed out".into(),
            ));
        }
        Ok(VpnKey {
            id: format!("k{n}"),
            access_url: format!("ss://{label}-{n}@vpn.example:443"),
            port: Some(443),
        })
    }
}

// ============================================================================
// RecordingChatSender
// ============================================================================

pub struct RecordingChatSender {
    delivered: Mutex<Vec<(i64, String)>>,
    fail_for: Vec<i64>,
}

impl RecordingChatSender {
    pub fn new() -> Self {
        Self::failing_for(Vec::new())
    }

    pub fn failing_for(fail_for: Vec<i64>) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_for,
        }
    }

    pub fn delivered(&self) -> Vec<(i64, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSender for RecordingChatSender {
    async fn send_text(&self, telegram_id: i64, text: &str) -> AppResult<()> {
        if self.fail_for.contains(&telegram_id) {
            return Err(AppError::Delivery("Forbidden: bot was blocked".into()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((telegram_id, text.to_string()));
        Ok(())
    }
}
