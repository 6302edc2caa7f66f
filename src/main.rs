use dotenvy::dotenv;
use std::sync::Arc;
use superteam_bot::api::http::create_http_client;
use superteam_bot::api::{CachedContent, CachedRag, ContentClient, RagClient};
use superteam_bot::bot::{dispatch, BotContext, Command, MenuStorage};
use superteam_bot::cache::Cache;
use superteam_bot::config::Settings;
use superteam_bot::logging::{self, RedactionPatterns};
use superteam_bot::transport::{self, Transport};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    logging::init(patterns);

    info!("Starting SuperTeam bot...");

    let settings = init_settings();
    let transport = init_transport(&settings);

    let cache = Arc::new(Cache::connect(&settings).await);
    info!("Cache backend: {}", cache.backend_name());

    let ctx = init_context(&settings, cache);

    let bot = Bot::new(settings.telegram_bot_token.clone());
    register_commands(&bot).await;

    let dispatcher = Dispatcher::builder(bot.clone(), dispatch::schema())
        .dependencies(dptree::deps![ctx, MenuStorage::new()])
        .enable_ctrlc_handler()
        .build();

    info!("Bot is running...");
    transport::run(bot, dispatcher, transport, settings.port).await?;

    Ok(())
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}

fn init_transport(settings: &Settings) -> Transport {
    match Transport::from_settings(settings) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    }
}

fn init_context(settings: &Settings, cache: Arc<Cache>) -> Arc<BotContext> {
    let http = create_http_client();

    let content = CachedContent::new(
        Arc::new(ContentClient::new(http.clone(), settings.api_mongo_url.clone())),
        Arc::clone(&cache),
    );
    let rag = CachedRag::new(
        Arc::new(RagClient::new(http, settings.api_rag_url.clone())),
        cache,
    );
    info!("API clients initialized.");

    Arc::new(BotContext::new(content, rag))
}

async fn register_commands(bot: &Bot) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }
}
