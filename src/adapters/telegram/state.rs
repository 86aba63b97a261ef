use std::sync::Arc;

use crate::{
    application::ports::store::BotStore,
    infra::{config::AppConfig, rate_limit::RateLimiter},
    use_cases::{admin::AdminUseCases, provisioning::ProvisioningUseCases},
};

/// Everything a handler needs, cloned into each dispatched update.
#[derive(Clone)]
pub struct BotState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BotStore>,
    pub provisioning: Arc<ProvisioningUseCases>,
    pub admin: Arc<AdminUseCases>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl BotState {
    pub fn is_admin(&self, telegram_id: i64) -> bool {
        telegram_id == self.config.admin_id
    }
}
