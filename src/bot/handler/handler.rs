use async_trait::async_trait;
use serenity::all::{ChannelId, CommandId, GuildId, MessageId, UserId};

use crate::bot::{chat_event::chat_event::InteractionRef, commands::commands::BotResult, schema::schema::{CommandSchema, RemoteCommand}};

/// Where application command schemas live on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandScope {
    Global,
    Guild(GuildId),
}

/// Outbound calls to the gateway. Each call is independent; none is retried.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// `None` until the gateway has identified the bot.
    fn bot_user_id(&self) -> Option<UserId>;

    async fn send_message(&self, channel: ChannelId, content: &str) -> BotResult<MessageId>;
    async fn reply(&self, channel: ChannelId, to: MessageId, content: &str) -> BotResult<MessageId>;
    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str) -> BotResult<()>;
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> BotResult<()>;
    async fn broadcast_typing(&self, channel: ChannelId) -> BotResult<()>;
    async fn direct_message(&self, user: UserId, content: &str) -> BotResult<()>;

    async fn create_interaction_response(&self, interaction: &InteractionRef, content: &str, ephemeral: bool) -> BotResult<()>;
    async fn edit_interaction_response(&self, interaction: &InteractionRef, content: &str) -> BotResult<()>;
    async fn delete_interaction_response(&self, interaction: &InteractionRef) -> BotResult<()>;

    async fn known_guilds(&self) -> Vec<GuildId>;
    async fn fetch_commands(&self, scope: CommandScope) -> BotResult<Vec<RemoteCommand>>;
    /// Replaces every command in `scope` with `schemas`, returning how many the platform accepted.
    async fn overwrite_commands(&self, scope: CommandScope, schemas: &[CommandSchema]) -> BotResult<usize>;
    async fn delete_command(&self, scope: CommandScope, id: CommandId) -> BotResult<()>;
}
