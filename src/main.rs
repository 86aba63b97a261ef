use dotenvy::dotenv;
use secrecy::ExposeSecret;
use teloxide::Bot;

use comet_bot::{
    adapters::telegram::run_bot,
    infra::{
        config::AppConfig,
        setup::{init_bot_state, init_tracing},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env();
    let bot = Bot::new(config.bot_token.expose_secret());

    let state = init_bot_state(config, bot.clone()).await?;

    run_bot(bot, state).await;

    Ok(())
}
