use std::{collections::HashMap, fs, path::{Path, PathBuf}, str::FromStr, time::Duration};

use serenity::all::{GuildId, UserId};
use tracing::{info, warn};

use crate::bot::{commands::commands::BotResult, guild::guild::GuildConfig, state::def::{BotConfig, BotError, BotSecrets, RuntimeMode}};

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_NOTICE_SECS: u64 = 5;

impl FromStr for RuntimeMode {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "staging" => Ok(RuntimeMode::Development),
            "" | "prod" | "production" => Ok(RuntimeMode::Production),
            other => Err(BotError::Config(format!("unknown runtime mode '{other}'"))),
        }
    }
}

impl BotSecrets {
    pub fn from_env() -> BotResult<Self> {
        dotenvy::dotenv().ok();
        let discord_token = dotenvy::var("DISCORD_TOKEN").map_err(|_| BotError::MissingEnv("DISCORD_TOKEN"))?;
        Ok(Self { discord_token })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            mode: RuntimeMode::Production,
            admins: Vec::new(),
            default_prefix: DEFAULT_PREFIX.to_string(),
            notice_delay: Duration::from_secs(DEFAULT_NOTICE_SECS),
            guilds: HashMap::new(),
            guilds_file: None,
        }
    }
}

impl BotConfig {
    /// Reads the process configuration from the environment (and `.env`).
    pub fn from_env() -> BotResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_lookup(|key| dotenvy::var(key).ok())?;

        if let Some(path) = config.guilds_file.clone() {
            config.guilds = load_guild_configs(&path)?;
            info!("Loaded {} guild configs from {}", config.guilds.len(), path.display());
        }

        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> BotResult<Self> where F: Fn(&str) -> Option<String> {
        let mut config = BotConfig::default();

        if let Some(mode) = lookup("UBERBOT_ENV") {
            config.mode = mode.parse()?;
        }

        if let Some(admins) = lookup("UBERBOT_ADMINS") {
            config.admins = parse_user_ids(&admins)?;
        }

        if let Some(prefix) = lookup("UBERBOT_PREFIX") {
            let prefix = prefix.trim();
            if prefix.is_empty() {
                return Err(BotError::Config("UBERBOT_PREFIX must not be empty".to_string()));
            }
            config.default_prefix = prefix.to_string();
        }

        if let Some(secs) = lookup("UBERBOT_NOTICE_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|e| BotError::Config(format!("UBERBOT_NOTICE_SECS: {e}")))?;
            config.notice_delay = Duration::from_secs(secs);
        }

        config.guilds_file = lookup("UBERBOT_GUILDS").map(PathBuf::from);

        Ok(config)
    }

    pub fn is_dev(&self) -> bool {
        self.mode == RuntimeMode::Development
    }
}

pub fn parse_user_ids(input: &str) -> BotResult<Vec<UserId>> {
    let mut ids = Vec::new();
    for raw in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match raw.parse::<u64>() {
            Ok(id) if id != 0 => ids.push(UserId::new(id)),
            _ => return Err(BotError::Config(format!("invalid user id '{raw}'"))),
        }
    }
    Ok(ids)
}

/// Guild configs are stored as a JSON object keyed by guild id.
pub fn load_guild_configs(path: &Path) -> BotResult<HashMap<GuildId, GuildConfig>> {
    let raw = fs::read_to_string(path)?;
    let parsed: HashMap<String, GuildConfig> = serde_json::from_str(&raw)?;

    let mut guilds = HashMap::new();
    for (key, cfg) in parsed {
        match key.parse::<u64>() {
            Ok(id) if id != 0 => {
                guilds.insert(GuildId::new(id), cfg);
            }
            _ => warn!("Skipping guild config with invalid id '{}'", key),
        }
    }
    Ok(guilds)
}
