use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relaybot::bus::EventBus;
use relaybot::config::Config;
use relaybot::inbound::Platform;
use relaybot::llm::LlmClient;
use relaybot::platform;
use relaybot::reply::{LanguageModel, ReplyGenerator};
use relaybot::router::PlatformRouter;

const BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RELAYBOT_CONFIG").ok())
        .map(PathBuf::from);

    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("No config file given, using environment only"),
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Provider: {}", config.llm.provider);
    info!("  Model: {}", config.llm.model);
    if config.llm.api_key.is_empty() {
        warn!("GROQ_API_KEY not set; reply generation will fail");
    }

    let model: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(config.llm.clone()));
    let generator = ReplyGenerator::new(model);
    let bus = Arc::new(EventBus::new(BUS_CAPACITY));

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    // Routers subscribe before any connector can publish
    for (platform, platform_config) in [
        (Platform::Discord, config.discord.clone()),
        (Platform::Telegram, config.telegram.clone()),
    ] {
        let router = Arc::new(PlatformRouter::new(
            platform,
            platform_config,
            generator.clone(),
            bus.clone(),
        ));
        router.log_scope();
        let inbound = bus.subscribe_inbound();
        tasks.spawn(async move {
            router.run(inbound).await;
            Ok(())
        });
    }

    if config.discord.credential_token.is_empty() {
        warn!("DISCORD_API_TOKEN not set; Discord connector disabled");
    } else {
        tasks.spawn(platform::discord::run(config.discord.clone(), bus.clone()));
    }

    if config.telegram.credential_token.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN not set; Telegram connector disabled");
    } else {
        tasks.spawn(platform::telegram::run(config.telegram.clone(), bus.clone()));
    }

    if config.dashboard.bind.is_empty() {
        info!("Dashboard disabled");
    } else {
        tasks.spawn(platform::dashboard::run(config.dashboard.clone(), bus.clone()));
    }

    info!("Relay is running");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received ctrl-c, shutting down");
                break;
            }
            Some(joined) = tasks.join_next() => match joined {
                Ok(Ok(())) => warn!("A relay task exited"),
                Ok(Err(e)) => error!("Relay task failed: {:#}", e),
                Err(e) => error!("Relay task panicked: {}", e),
            },
        }
    }

    // Stop routing new messages before tearing the tasks down
    bus.close();
    tasks.shutdown().await;
    Ok(())
}
