use core::fmt;
use std::{collections::HashSet, fmt::Display};

use async_trait::async_trait;
use serde::Deserialize;
use serenity::all::{ChannelId, UserId};

use crate::bot::{chat_event::chat_event::Invoker, commands::commands::CommandInfo, guild::guild::GuildContext};

#[derive(Clone, Copy, Deserialize, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum PermissionLevel {
    Admin,
    Moderator,
    Everyone,
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionLevel::Admin => "bot admin",
            PermissionLevel::Moderator => "moderator",
            PermissionLevel::Everyone => "everyone",
        };
        write!(f, "{}", s)
    }
}

/// Bot-wide admin authority, independent of any guild.
pub trait Authorizer: Send + Sync {
    fn is_elevated_admin(&self, user: UserId) -> bool;
    /// Recipients of error reports.
    fn admins(&self) -> Vec<UserId>;
}

#[derive(Debug, Clone, Default)]
pub struct AdminList {
    admins: HashSet<UserId>,
}

impl AdminList {
    pub fn new<I>(admins: I) -> Self where I: IntoIterator<Item = UserId> {
        Self { admins: admins.into_iter().collect() }
    }
}

impl Authorizer for AdminList {
    fn is_elevated_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    fn admins(&self) -> Vec<UserId> {
        let mut admins: Vec<UserId> = self.admins.iter().copied().collect();
        admins.sort();
        admins
    }
}

/// Guild policy (whitelists, ignored channels, disabled triggers). Bot admins bypass it.
#[async_trait]
pub trait InvocationPolicy: Send + Sync {
    async fn allows(&self, guild: &GuildContext, invoker: &Invoker, channel: ChannelId, trigger: &str) -> bool;
}

pub struct AllowAll;

#[async_trait]
impl InvocationPolicy for AllowAll {
    async fn allows(&self, _guild: &GuildContext, _invoker: &Invoker, _channel: ChannelId, _trigger: &str) -> bool {
        true
    }
}

impl CommandInfo {
    pub fn permission(&self) -> PermissionLevel {
        if self.public {
            PermissionLevel::Everyone
        } else {
            PermissionLevel::Moderator
        }
    }
}

pub async fn has_permission(invoker: &Invoker, required: PermissionLevel, guild: &GuildContext, auth: &dyn Authorizer) -> bool {
    // Bot admins supersede everything
    if auth.is_elevated_admin(invoker.user_id) {
        return true;
    }

    match required {
        PermissionLevel::Everyone => true,
        PermissionLevel::Moderator => guild.is_moderator(invoker.user_id, &invoker.roles).await,
        PermissionLevel::Admin => false,
    }
}
