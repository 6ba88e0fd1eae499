use core::fmt;

use serenity::all::{ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};

/// Every inbound event the dispatcher understands.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(MessageEvent),
    Interaction(InteractionEvent),
}

#[derive(Debug, Clone)]
pub enum InteractionEvent {
    Command(CommandInvocation),
    Component(ComponentActivation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
    pub bot: bool,
}

#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author: Invoker,
    pub content: String,
}

/// What is needed to answer an interaction after the fact.
#[derive(Debug, Clone)]
pub struct InteractionRef {
    pub id: InteractionId,
    pub token: String,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub invoker: Invoker,
}

#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub interaction: InteractionRef,
    pub name: String,
    pub options: Vec<InteractionOption>,
}

#[derive(Debug, Clone)]
pub struct ComponentActivation {
    pub interaction: InteractionRef,
    pub custom_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOption {
    pub name: String,
    pub value: OptionValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Int(i64),
    Number(f64),
    String(String),
    Bool(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
    /// Sub-command or sub-command group carrying its own options.
    Nested(Vec<InteractionOption>),
    Unsupported,
}

/// The event a handler was invoked from. Exactly one of the two.
#[derive(Debug, Clone)]
pub enum EventOrigin {
    Message(MessageEvent),
    Interaction(InteractionRef),
}

impl EventOrigin {
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            EventOrigin::Message(m) => m.guild_id,
            EventOrigin::Interaction(i) => i.guild_id,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            EventOrigin::Message(m) => m.channel_id,
            EventOrigin::Interaction(i) => i.channel_id,
        }
    }

    pub fn invoker(&self) -> &Invoker {
        match self {
            EventOrigin::Message(m) => &m.author,
            EventOrigin::Interaction(i) => &i.invoker,
        }
    }
}

impl InteractionOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self { name: name.into(), value }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{v}"),
            OptionValue::Number(v) => write!(f, "{v}"),
            OptionValue::String(v) => write!(f, "{v}"),
            OptionValue::Bool(v) => write!(f, "{v}"),
            OptionValue::User(id) => write!(f, "<@{id}>"),
            OptionValue::Channel(id) => write!(f, "<#{id}>"),
            OptionValue::Role(id) => write!(f, "<@&{id}>"),
            OptionValue::Nested(opts) => write!(f, "[{} options]", opts.len()),
            OptionValue::Unsupported => write!(f, "?"),
        }
    }
}
