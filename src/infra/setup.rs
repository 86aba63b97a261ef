use std::{fs::File, sync::Arc, time::Duration};

use teloxide::Bot;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        persistence::PgStore,
        telegram::{BotState, sender::TelegramSender},
    },
    application::ports::{chat::ChatSender, store::BotStore, vpn::VpnKeyService},
    infra::{config::AppConfig, db::init_db, outline::OutlineClient, rate_limit::RateLimiter},
    use_cases::{admin::AdminUseCases, provisioning::ProvisioningUseCases},
};

/// The admission window is fixed; only the per-window budget is configurable.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

pub async fn init_bot_state(config: AppConfig, bot: Bot) -> anyhow::Result<BotState> {
    let pool = init_db(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool)) as Arc<dyn BotStore>;

    let outline = Arc::new(OutlineClient::new(&config.outline)?) as Arc<dyn VpnKeyService>;
    let provisioning = Arc::new(ProvisioningUseCases::new(outline));

    let sender = Arc::new(TelegramSender::new(bot)) as Arc<dyn ChatSender>;
    let admin = Arc::new(AdminUseCases::new(
        sender,
        Duration::from_millis(config.broadcast_delay_ms),
    ));

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_per_minute,
        RATE_LIMIT_WINDOW,
    ));

    Ok(BotState {
        config: Arc::new(config),
        store,
        provisioning,
        admin,
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comet_bot=info,teloxide=warn".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
