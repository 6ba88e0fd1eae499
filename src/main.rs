use std::sync::Arc;

use serenity::{all::GatewayIntents, Client};
use tracing::{error, info};
use uberbot::bot::{
    commands::{utility, RegistryBuilder},
    dispatcher::dispatcher::Dispatcher,
    guild::guild::{GuildConfig, GuildStore},
    permissions::permissions::AdminList,
    platforms::discord::{discord::SerenityClient, event_loop::GatewayHandler},
    run_event_loop,
    state::def::{BotConfig, BotSecrets},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("Bot stopped: {e}");
        std::process::exit(1);
    }
}

async fn run() -> uberbot::bot::commands::commands::BotResult<()> {
    let secrets = BotSecrets::from_env()?;
    let config = BotConfig::from_env()?;
    info!("Starting uberbot in {} mode with {} admins", config.mode, config.admins.len());

    let mut builder = RegistryBuilder::new();
    utility::register(&mut builder);
    let registry = builder.seal();

    let default_guild = GuildConfig { prefix: config.default_prefix.clone(), ..Default::default() };
    let guilds = Arc::new(GuildStore::with_guilds(default_guild, config.guilds.clone()));

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let http = Arc::new(serenity::http::Http::new(&secrets.discord_token));
    let chat = Arc::new(SerenityClient::new(http));

    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        guilds,
        chat.clone(),
        Arc::new(AdminList::new(config.admins.iter().copied())),
        config.notice_delay,
    ));

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(run_event_loop(dispatcher, rx));

    let handler = GatewayHandler::new(tx, chat, registry, config.mode);
    let mut client = Client::builder(&secrets.discord_token, intents).event_handler(handler).await?;
    client.start().await?;
    Ok(())
}
