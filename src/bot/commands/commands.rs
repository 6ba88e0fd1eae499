use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::bot::{
    arguments::arguments::{ArgInfo, Arguments},
    chat_event::chat_event::{ComponentActivation, EventOrigin},
    commands::CommandRegistry,
    guild::guild::GuildContext,
    handler::handler::ChatClient,
    permissions::permissions::{has_permission, Authorizer, PermissionLevel},
    state::def::BotError,
};

pub type BotResult<T> = Result<T, BotError>;

// Group tags
pub const MODERATION: &str = "moderation";
pub const UTILITY: &str = "utility";

pub type CommandHandler = Arc<dyn Fn(CmdContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync>;
pub type ComponentHandler = Arc<dyn Fn(ComponentContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync>;

/// Everything about a command besides the function it runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandInfo {
    pub trigger: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub arguments: Vec<ArgInfo>,
    /// Usable without being a moderator or bot admin.
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub typing: bool,
    #[serde(default)]
    pub is_parent: bool,
    #[serde(default)]
    pub is_child: bool,
}

#[derive(Clone)]
pub struct Command {
    pub info: Arc<CommandInfo>,
    pub handler: CommandHandler,
}

#[derive(Clone)]
pub struct Component {
    pub id: String,
    pub handler: ComponentHandler,
}

/// A single command invocation. Owned by the task running it.
#[derive(Clone)]
pub struct CmdContext {
    pub guild: Arc<GuildContext>,
    pub cmd: Arc<CommandInfo>,
    pub args: Arguments,
    pub origin: EventOrigin,
    pub client: Arc<dyn ChatClient>,
    pub registry: Arc<CommandRegistry>,
    pub auth: Arc<dyn Authorizer>,
}

#[derive(Clone)]
pub struct ComponentContext {
    pub guild: Arc<GuildContext>,
    pub activation: ComponentActivation,
    pub client: Arc<dyn ChatClient>,
}

/// Canonical form of triggers, aliases and component ids.
pub fn normalize(token: &str) -> String {
    token.trim().nfkc().collect::<String>().to_lowercase()
}

impl CommandInfo {
    pub fn new(trigger: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            aliases: Vec::new(),
            description: description.into(),
            group: UTILITY.to_string(),
            parent_id: None,
            arguments: Vec::new(),
            public: false,
            typing: false,
            is_parent: false,
            is_child: false,
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Appends an argument; a repeated name replaces the earlier descriptor in place.
    pub fn arg(mut self, arg: ArgInfo) -> Self {
        if let Some(existing) = self.arguments.iter_mut().find(|a| a.name == arg.name) {
            warn!("Command '{}' declares argument '{}' twice", self.trigger, arg.name);
            *existing = arg;
        } else {
            self.arguments.push(arg);
        }
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn typing(mut self) -> Self {
        self.typing = true;
        self
    }

    pub fn parent(mut self) -> Self {
        self.is_parent = true;
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.is_child = true;
        self.parent_id = Some(parent.into());
        self
    }
}

impl Command {
    pub fn new<F>(info: CommandInfo, func: F) -> Self
    where
        F: Fn(CmdContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Self { info: Arc::new(info), handler: Arc::new(func) }
    }

    pub fn trigger(&self) -> &str {
        &self.info.trigger
    }
}

impl Component {
    pub fn new<F>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(ComponentContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Self { id: id.into(), handler: Arc::new(func) }
    }
}

impl CmdContext {
    /// Answers in the originating channel, or the guild's response channel if one is set.
    pub async fn reply(&self, content: &str) -> BotResult<()> {
        match &self.origin {
            EventOrigin::Message(msg) => {
                let channel = self.guild.config().await.response_channel_id.unwrap_or(msg.channel_id);
                self.client.send_message(channel, content).await?;
            }
            EventOrigin::Interaction(interaction) => {
                self.client.create_interaction_response(interaction, content, false).await?;
            }
        }
        Ok(())
    }

    /// For handlers that gate part of their behaviour above their own level.
    pub async fn invoker_has(&self, level: PermissionLevel) -> bool {
        has_permission(self.origin.invoker(), level, &self.guild, self.auth.as_ref()).await
    }
}

impl ComponentContext {
    pub async fn reply(&self, content: &str, ephemeral: bool) -> BotResult<()> {
        self.client.create_interaction_response(&self.activation.interaction, content, ephemeral).await
    }
}
