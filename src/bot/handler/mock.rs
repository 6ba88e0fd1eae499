//! Recording `ChatClient` used by the unit tests.

use std::sync::{atomic::{AtomicU64, Ordering}, Mutex};

use async_trait::async_trait;
use serenity::all::{ChannelId, CommandId, GuildId, MessageId, UserId};

use crate::bot::{
    chat_event::chat_event::InteractionRef,
    commands::commands::BotResult,
    handler::handler::{ChatClient, CommandScope},
    schema::schema::{CommandSchema, RemoteCommand},
    state::def::BotError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { channel: ChannelId, content: String },
    Reply { channel: ChannelId, to: MessageId, content: String },
    React { message: MessageId, emoji: String },
    Delete { channel: ChannelId, message: MessageId },
    Typing(ChannelId),
    Direct { user: UserId, content: String },
    CreateResponse { content: String, ephemeral: bool },
    EditResponse { content: String },
    DeleteResponse,
    Overwrite { scope: CommandScope, names: Vec<String> },
    DeleteCommand { scope: CommandScope, id: CommandId },
}

#[derive(Default)]
pub struct MockClient {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    pub bot_id: Option<UserId>,
    pub guilds: Vec<GuildId>,
    pub remote: Vec<RemoteCommand>,
    pub fail_fetch: bool,
    pub fail_edit: bool,
    pub fail_typing: bool,
    pub fail_overwrite_for: Option<GuildId>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count<F>(&self, pred: F) -> usize where F: Fn(&Call) -> bool {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(1000 + self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn failure() -> BotError {
    BotError::Custom("mock failure".to_string())
}

#[async_trait]
impl ChatClient for MockClient {
    fn bot_user_id(&self) -> Option<UserId> {
        self.bot_id
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> BotResult<MessageId> {
        self.record(Call::Send { channel, content: content.to_string() });
        Ok(self.next_message_id())
    }

    async fn reply(&self, channel: ChannelId, to: MessageId, content: &str) -> BotResult<MessageId> {
        self.record(Call::Reply { channel, to, content: content.to_string() });
        Ok(self.next_message_id())
    }

    async fn react(&self, _channel: ChannelId, message: MessageId, emoji: &str) -> BotResult<()> {
        self.record(Call::React { message, emoji: emoji.to_string() });
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> BotResult<()> {
        self.record(Call::Delete { channel, message });
        Ok(())
    }

    async fn broadcast_typing(&self, channel: ChannelId) -> BotResult<()> {
        self.record(Call::Typing(channel));
        if self.fail_typing {
            return Err(failure());
        }
        Ok(())
    }

    async fn direct_message(&self, user: UserId, content: &str) -> BotResult<()> {
        self.record(Call::Direct { user, content: content.to_string() });
        Ok(())
    }

    async fn create_interaction_response(&self, _interaction: &InteractionRef, content: &str, ephemeral: bool) -> BotResult<()> {
        self.record(Call::CreateResponse { content: content.to_string(), ephemeral });
        Ok(())
    }

    async fn edit_interaction_response(&self, _interaction: &InteractionRef, content: &str) -> BotResult<()> {
        self.record(Call::EditResponse { content: content.to_string() });
        if self.fail_edit {
            return Err(failure());
        }
        Ok(())
    }

    async fn delete_interaction_response(&self, _interaction: &InteractionRef) -> BotResult<()> {
        self.record(Call::DeleteResponse);
        Ok(())
    }

    async fn known_guilds(&self) -> Vec<GuildId> {
        self.guilds.clone()
    }

    async fn fetch_commands(&self, _scope: CommandScope) -> BotResult<Vec<RemoteCommand>> {
        if self.fail_fetch {
            return Err(failure());
        }
        Ok(self.remote.clone())
    }

    async fn overwrite_commands(&self, scope: CommandScope, schemas: &[CommandSchema]) -> BotResult<usize> {
        self.record(Call::Overwrite { scope, names: schemas.iter().map(|s| s.name.clone()).collect() });
        if let (CommandScope::Guild(guild), Some(bad)) = (scope, self.fail_overwrite_for) {
            if guild == bad {
                return Err(failure());
            }
        }
        Ok(schemas.len())
    }

    async fn delete_command(&self, scope: CommandScope, id: CommandId) -> BotResult<()> {
        self.record(Call::DeleteCommand { scope, id });
        Ok(())
    }
}
