use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serenity::{
    all::{
        ChannelId, Command, CommandDataOption, CommandDataOptionValue, CommandId, CommandOption, CommandOptionType, CommandType,
        CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, GuildId, Interaction,
        Message, MessageId, ReactionType, RoleId, User, UserId,
    },
    http::Http,
};
use tokio::sync::RwLock;

use crate::bot::{
    chat_event::chat_event::{
        ChatEvent, CommandInvocation, ComponentActivation, InteractionEvent, InteractionOption, InteractionRef, Invoker, MessageEvent,
        OptionValue,
    },
    commands::commands::BotResult,
    handler::handler::{ChatClient, CommandScope},
    schema::schema::{CommandKind, CommandSchema, OptionChoice, OptionKind, OptionSchema, RemoteCommand},
};

/// `ChatClient` over serenity's REST client.
pub struct SerenityClient {
    http: Arc<Http>,
    bot_id: OnceCell<UserId>,
    guilds: RwLock<Vec<GuildId>>,
}

impl SerenityClient {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http, bot_id: OnceCell::new(), guilds: RwLock::new(Vec::new()) }
    }

    fn http(&self) -> &Http {
        &self.http
    }

    /// Records what the gateway told us on identify.
    pub async fn on_ready(&self, bot_id: UserId, guilds: Vec<GuildId>) {
        let _ = self.bot_id.set(bot_id);
        *self.guilds.write().await = guilds;
    }

    pub async fn add_guild(&self, guild: GuildId) {
        let mut guilds = self.guilds.write().await;
        if !guilds.contains(&guild) {
            guilds.push(guild);
        }
    }
}

#[async_trait]
impl ChatClient for SerenityClient {
    fn bot_user_id(&self) -> Option<UserId> {
        self.bot_id.get().copied()
    }

    async fn send_message(&self, channel: ChannelId, content: &str) -> BotResult<MessageId> {
        Ok(channel.say(self.http(), content).await?.id)
    }

    async fn reply(&self, channel: ChannelId, to: MessageId, content: &str) -> BotResult<MessageId> {
        let message = CreateMessage::new().content(content).reference_message((channel, to));
        Ok(channel.send_message(self.http(), message).await?.id)
    }

    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str) -> BotResult<()> {
        channel.create_reaction(self.http(), message, ReactionType::Unicode(emoji.to_string())).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> BotResult<()> {
        channel.delete_message(self.http(), message).await?;
        Ok(())
    }

    async fn broadcast_typing(&self, channel: ChannelId) -> BotResult<()> {
        channel.broadcast_typing(self.http()).await?;
        Ok(())
    }

    async fn direct_message(&self, user: UserId, content: &str) -> BotResult<()> {
        let dm = user.create_dm_channel(self.http()).await?;
        dm.id.say(self.http(), content).await?;
        Ok(())
    }

    async fn create_interaction_response(&self, interaction: &InteractionRef, content: &str, ephemeral: bool) -> BotResult<()> {
        let response = CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(content).ephemeral(ephemeral));
        self.http.create_interaction_response(interaction.id, &interaction.token, &response, Vec::new()).await?;
        Ok(())
    }

    async fn edit_interaction_response(&self, interaction: &InteractionRef, content: &str) -> BotResult<()> {
        let edit = EditInteractionResponse::new().content(content);
        self.http.edit_original_interaction_response(&interaction.token, &edit, Vec::new()).await?;
        Ok(())
    }

    async fn delete_interaction_response(&self, interaction: &InteractionRef) -> BotResult<()> {
        self.http.delete_original_interaction_response(&interaction.token).await?;
        Ok(())
    }

    async fn known_guilds(&self) -> Vec<GuildId> {
        self.guilds.read().await.clone()
    }

    async fn fetch_commands(&self, scope: CommandScope) -> BotResult<Vec<RemoteCommand>> {
        let commands = match scope {
            CommandScope::Global => Command::get_global_commands(self.http()).await?,
            CommandScope::Guild(guild) => guild.get_commands(self.http()).await?,
        };
        Ok(commands.iter().map(remote_command).collect())
    }

    async fn overwrite_commands(&self, scope: CommandScope, schemas: &[CommandSchema]) -> BotResult<usize> {
        let builders: Vec<_> = schemas.iter().map(CommandSchema::to_create_command).collect();
        let accepted = match scope {
            CommandScope::Global => Command::set_global_commands(self.http(), builders).await?,
            CommandScope::Guild(guild) => guild.set_commands(self.http(), builders).await?,
        };
        Ok(accepted.len())
    }

    async fn delete_command(&self, scope: CommandScope, id: CommandId) -> BotResult<()> {
        match scope {
            CommandScope::Global => Command::delete_global_command(self.http(), id).await?,
            CommandScope::Guild(guild) => guild.delete_command(self.http(), id).await?,
        }
        Ok(())
    }
}

fn invoker(user: &User, roles: Option<&[RoleId]>) -> Invoker {
    Invoker { user_id: user.id, roles: roles.map(<[RoleId]>::to_vec).unwrap_or_default(), bot: user.bot }
}

pub fn map_message(msg: &Message) -> ChatEvent {
    let roles = msg.member.as_ref().map(|m| m.roles.as_slice());
    ChatEvent::Message(MessageEvent {
        id: msg.id,
        guild_id: msg.guild_id,
        channel_id: msg.channel_id,
        author: invoker(&msg.author, roles),
        content: msg.content.clone(),
    })
}

/// Autocomplete, modal and ping interactions are not routed.
pub fn map_interaction(interaction: &Interaction) -> Option<ChatEvent> {
    let event = match interaction {
        Interaction::Command(cmd) => InteractionEvent::Command(CommandInvocation {
            interaction: InteractionRef {
                id: cmd.id,
                token: cmd.token.clone(),
                guild_id: cmd.guild_id,
                channel_id: cmd.channel_id,
                invoker: invoker(&cmd.user, cmd.member.as_ref().map(|m| m.roles.as_slice())),
            },
            name: cmd.data.name.clone(),
            options: map_options(&cmd.data.options),
        }),
        Interaction::Component(comp) => InteractionEvent::Component(ComponentActivation {
            interaction: InteractionRef {
                id: comp.id,
                token: comp.token.clone(),
                guild_id: comp.guild_id,
                channel_id: comp.channel_id,
                invoker: invoker(&comp.user, comp.member.as_ref().map(|m| m.roles.as_slice())),
            },
            custom_id: comp.data.custom_id.clone(),
        }),
        _ => return None,
    };
    Some(ChatEvent::Interaction(event))
}

fn map_options(options: &[CommandDataOption]) -> Vec<InteractionOption> {
    options.iter().map(|o| InteractionOption::new(o.name.clone(), map_value(&o.value))).collect()
}

fn map_value(value: &CommandDataOptionValue) -> OptionValue {
    match value {
        CommandDataOptionValue::Integer(v) => OptionValue::Int(*v),
        CommandDataOptionValue::Number(v) => OptionValue::Number(*v),
        CommandDataOptionValue::String(v) => OptionValue::String(v.clone()),
        CommandDataOptionValue::Boolean(v) => OptionValue::Bool(*v),
        CommandDataOptionValue::User(id) => OptionValue::User(*id),
        CommandDataOptionValue::Channel(id) => OptionValue::Channel(*id),
        CommandDataOptionValue::Role(id) => OptionValue::Role(*id),
        CommandDataOptionValue::SubCommand(nested) | CommandDataOptionValue::SubCommandGroup(nested) => {
            OptionValue::Nested(map_options(nested))
        }
        _ => OptionValue::Unsupported,
    }
}

fn remote_command(command: &Command) -> RemoteCommand {
    let kind = match command.kind {
        CommandType::User => CommandKind::User,
        CommandType::Message => CommandKind::Message,
        _ => CommandKind::ChatInput,
    };

    RemoteCommand {
        id: command.id,
        schema: CommandSchema {
            name: command.name.clone(),
            description: command.description.clone(),
            kind,
            options: command.options.iter().map(remote_option).collect(),
        },
    }
}

fn remote_option(option: &CommandOption) -> OptionSchema {
    let kind = match option.kind {
        CommandOptionType::SubCommand => OptionKind::SubCommand,
        CommandOptionType::SubCommandGroup => OptionKind::SubCommandGroup,
        CommandOptionType::Integer => OptionKind::Integer,
        CommandOptionType::Boolean => OptionKind::Boolean,
        CommandOptionType::User => OptionKind::User,
        CommandOptionType::Channel => OptionKind::Channel,
        CommandOptionType::Role => OptionKind::Role,
        _ => OptionKind::String,
    };

    OptionSchema {
        kind,
        name: option.name.clone(),
        description: option.description.clone(),
        required: option.required,
        choices: option
            .choices
            .iter()
            .map(|c| OptionChoice {
                name: c.name.clone(),
                value: c.value.as_str().map(str::to_string).unwrap_or_else(|| c.value.to_string()),
            })
            .collect(),
        options: option.options.iter().map(remote_option).collect(),
    }
}
