use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use async_trait::async_trait;
use serenity::all::{Context, EventHandler, Guild, Interaction, Message, Ready};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::bot::{
    chat_event::chat_event::ChatEvent,
    commands::CommandRegistry,
    platforms::discord::discord::{map_interaction, map_message, SerenityClient},
    state::def::RuntimeMode,
};

/// Forwards gateway events into the dispatch channel.
pub struct GatewayHandler {
    pub tx: UnboundedSender<ChatEvent>,
    pub client: Arc<SerenityClient>,
    pub registry: Arc<CommandRegistry>,
    pub mode: RuntimeMode,
    published: AtomicBool,
}

impl GatewayHandler {
    pub fn new(tx: UnboundedSender<ChatEvent>, client: Arc<SerenityClient>, registry: Arc<CommandRegistry>, mode: RuntimeMode) -> Self {
        Self { tx, client, registry, mode, published: AtomicBool::new(false) }
    }

    fn forward(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            warn!("Dispatch channel closed, dropping event");
        }
    }
}

#[async_trait]
impl EventHandler for GatewayHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected in {} mode", ready.user.name, self.mode);
        self.client.on_ready(ready.user.id, ready.guilds.iter().map(|g| g.id).collect()).await;

        // Reconnects fire ready again; schemas only need one push per process
        if self.published.swap(true, Ordering::SeqCst) {
            return;
        }

        let scopes = self.registry.publish_schemas(&*self.client, self.mode).await;
        info!("Published application commands to {} scope(s)", scopes);
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        debug!("Guild available: {} ({})", guild.name, guild.id);
        self.client.add_guild(guild.id).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.forward(map_message(&msg));
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        match map_interaction(&interaction) {
            Some(event) => self.forward(event),
            None => debug!("Ignoring interaction of kind {:?}", interaction.kind()),
        }
    }
}
