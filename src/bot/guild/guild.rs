use std::{collections::{HashMap, HashSet}, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, GuildId, RoleId, UserId};
use tokio::sync::RwLock;
use tracing::debug;

use crate::bot::state::state::DEFAULT_PREFIX;

/// Per-guild invocation settings. Persistence lives outside this crate.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GuildConfig {
    pub prefix: String,
    /// When set, command output is redirected here and typing is not shown.
    pub response_channel_id: Option<ChannelId>,
    pub moderators: HashSet<UserId>,
    pub moderator_roles: HashSet<RoleId>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        GuildConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            response_channel_id: None,
            moderators: HashSet::new(),
            moderator_roles: HashSet::new(),
        }
    }
}

/// Long-lived bot state for one guild. Shared by reference, never copied.
#[derive(Debug)]
pub struct GuildContext {
    pub id: Option<GuildId>,
    config: RwLock<GuildConfig>,
}

impl GuildContext {
    pub fn new(id: Option<GuildId>, config: GuildConfig) -> Self {
        Self { id, config: RwLock::new(config) }
    }

    pub async fn config(&self) -> GuildConfig {
        self.config.read().await.clone()
    }

    pub async fn update<F>(&self, mutator: F) where F: FnOnce(&mut GuildConfig) {
        let mut cfg = self.config.write().await;
        mutator(&mut cfg);
    }

    pub async fn is_moderator(&self, user: UserId, roles: &[RoleId]) -> bool {
        let cfg = self.config.read().await;
        cfg.moderators.contains(&user) || roles.iter().any(|r| cfg.moderator_roles.contains(r))
    }
}

#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// `None` is a direct message; implementations hand back a default context.
    async fn resolve_context(&self, guild_id: Option<GuildId>) -> Arc<GuildContext>;
}

/// In-memory guild directory seeded from configuration.
pub struct GuildStore {
    guilds: RwLock<HashMap<GuildId, Arc<GuildContext>>>,
    default_config: GuildConfig,
    direct: Arc<GuildContext>,
}

impl GuildStore {
    pub fn new(default_config: GuildConfig) -> Self {
        Self {
            guilds: RwLock::new(HashMap::new()),
            direct: Arc::new(GuildContext::new(None, default_config.clone())),
            default_config,
        }
    }

    pub fn with_guilds(default_config: GuildConfig, seeded: HashMap<GuildId, GuildConfig>) -> Self {
        let guilds = seeded
            .into_iter()
            .map(|(id, cfg)| (id, Arc::new(GuildContext::new(Some(id), cfg))))
            .collect();

        Self {
            guilds: RwLock::new(guilds),
            direct: Arc::new(GuildContext::new(None, default_config.clone())),
            default_config,
        }
    }
}

#[async_trait]
impl GuildDirectory for GuildStore {
    async fn resolve_context(&self, guild_id: Option<GuildId>) -> Arc<GuildContext> {
        let Some(id) = guild_id else {
            return self.direct.clone();
        };

        if let Some(ctx) = self.guilds.read().await.get(&id) {
            return ctx.clone();
        }

        let mut guilds = self.guilds.write().await;
        guilds
            .entry(id)
            .or_insert_with(|| {
                debug!("Creating default context for guild {}", id);
                Arc::new(GuildContext::new(Some(id), self.default_config.clone()))
            })
            .clone()
    }
}
