use std::{collections::HashMap, fmt, io, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serenity::all::{GuildId, UserId};
use thiserror::Error;

use crate::bot::guild::guild::GuildConfig;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),
    #[error("JSON deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Custom(String),
}

/// Whether schemas are pushed globally or to every guild the bot can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum RuntimeMode {
    #[default]
    Production,
    /// Staging bot that only lives in a handful of guilds.
    Development,
}

pub struct BotSecrets {
    pub discord_token: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub mode: RuntimeMode,
    pub admins: Vec<UserId>,
    pub default_prefix: String,
    pub notice_delay: Duration,
    pub guilds: HashMap<GuildId, GuildConfig>,
    pub guilds_file: Option<PathBuf>,
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeMode::Production => "production",
            RuntimeMode::Development => "development",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Debug for BotSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSecrets").field("discord_token", &"<redacted>").finish()
    }
}
