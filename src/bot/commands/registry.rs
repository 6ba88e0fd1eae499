use std::{collections::HashMap, sync::Arc};

use serenity::all::GuildId;
use tracing::{debug, error, info, warn};

use crate::bot::{
    commands::{
        commands::{normalize, Command, CommandInfo, Component},
        CommandRegistry, RegistryBuilder,
    },
    handler::handler::{ChatClient, CommandScope},
    schema::schema::{synthesize, synthesize_parent, CommandKind, CommandSchema},
    state::def::RuntimeMode,
};

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level command and its aliases.
    ///
    /// Aliases are first-come: a later command cannot claim one that already
    /// points elsewhere. Triggers are last-come: re-registering replaces, and
    /// a trigger always takes its own name back from another command's alias.
    pub fn register(&mut self, command: Command) -> &mut Self {
        let mut info = (*command.info).clone();
        info.aliases.push(info.trigger.clone());
        let trigger = normalize(&info.trigger);

        if let Some(owner) = self.aliases.insert(trigger.clone(), trigger.clone()).filter(|o| *o != trigger) {
            warn!("Alias '{}' of '{}' is now the trigger of '{}'", trigger, owner, info.trigger);
        }

        for alias in &info.aliases {
            let alias = normalize(alias);
            match self.aliases.get(&alias) {
                Some(existing) if *existing != trigger => {
                    warn!("Alias '{}' already registered for '{}', ignoring it for '{}'", alias, existing, info.trigger);
                }
                Some(_) => {}
                None => {
                    self.aliases.insert(alias, trigger.clone());
                }
            }
        }

        let command = Command { info: Arc::new(info), handler: command.handler };
        if self.commands.insert(trigger.clone(), command).is_some() {
            warn!("Command '{}' registered twice, replacing the earlier registration", trigger);
        }
        self
    }

    /// Adds a sub-command under its parent. Children get no aliases.
    pub fn register_child(&mut self, command: Command) -> &mut Self {
        let Some(parent) = command.info.parent_id.as_deref().map(normalize).filter(|p| !p.is_empty()) else {
            warn!("Child command '{}' has no parent id, dropping it", command.info.trigger);
            return self;
        };

        let child = normalize(&command.info.trigger);
        if self.children.entry(parent.clone()).or_default().insert(child.clone(), command).is_some() {
            warn!("Child command '{} {}' registered twice, replacing the earlier registration", parent, child);
        }
        self
    }

    /// Requests an interaction schema for `info`; synthesis happens at [`seal`](Self::seal).
    pub fn register_interaction_schema(&mut self, info: &CommandInfo) -> &mut Self {
        self.schema_requests.push(info.clone());
        self
    }

    pub fn register_component(&mut self, component: Component) -> &mut Self {
        let id = normalize(&component.id);
        if self.components.insert(id.clone(), component).is_some() {
            warn!("Component handler '{}' registered twice, replacing the earlier registration", id);
        }
        self
    }

    /// Ends the write phase.
    pub fn seal(self) -> Arc<CommandRegistry> {
        for parent in self.children.keys() {
            match self.commands.get(parent) {
                Some(cmd) if cmd.info.is_parent => {}
                _ => warn!("Child commands registered under '{}', which is not a registered parent", parent),
            }
        }

        let mut schemas = HashMap::new();
        for info in &self.schema_requests {
            let key = normalize(&info.trigger);
            if info.is_parent && info.is_child {
                debug!("'{}' is both parent and child, leaving its schema to its parent", key);
                continue;
            }

            let schema = if info.is_parent {
                let children = self.children.get(&key).into_iter().flat_map(|c| c.values()).map(|c| c.info.as_ref());
                synthesize_parent(info, children)
            } else {
                synthesize(info)
            };
            schemas.insert(key, schema);
        }

        info!(
            "Command registry sealed: {} commands, {} aliases, {} schemas, {} components",
            self.commands.len(),
            self.aliases.len(),
            schemas.len(),
            self.components.len()
        );

        Arc::new(CommandRegistry {
            commands: self.commands,
            children: self.children,
            aliases: self.aliases,
            schemas,
            components: self.components,
        })
    }
}

impl CommandRegistry {
    /// Resolves a typed trigger or alias to its command.
    pub fn resolve(&self, token: &str) -> Option<&Command> {
        let key = normalize(token);
        self.aliases.get(&key).and_then(|trigger| self.commands.get(trigger)).or_else(|| self.commands.get(&key))
    }

    /// Exact trigger lookup, no alias indirection.
    pub fn command(&self, trigger: &str) -> Option<&Command> {
        self.commands.get(&normalize(trigger))
    }

    pub fn child(&self, parent: &str, token: &str) -> Option<&Command> {
        self.children.get(&normalize(parent))?.get(&normalize(token))
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(&normalize(id))
    }

    /// Snapshot of every command's info, without handlers.
    pub fn list_public_info(&self) -> HashMap<String, CommandInfo> {
        self.commands.iter().map(|(trigger, cmd)| (trigger.clone(), (*cmd.info).clone())).collect()
    }

    pub fn schemas(&self) -> &HashMap<String, CommandSchema> {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Replaces the platform's command set with the synthesized schemas.
    ///
    /// Context-menu commands already on the platform are carried over. In
    /// development mode every known guild is overwritten in turn and the run
    /// stops at the first failure. Returns how many scopes were written.
    pub async fn publish_schemas(&self, client: &dyn ChatClient, mode: RuntimeMode) -> usize {
        let mut outgoing: Vec<CommandSchema> = match client.fetch_commands(CommandScope::Global).await {
            Ok(remote) => remote.into_iter().map(|r| r.schema).filter(|s| s.kind != CommandKind::ChatInput).collect(),
            Err(e) => {
                error!("Unable to fetch current application commands: {e}");
                Vec::new()
            }
        };

        let mut ours: Vec<&CommandSchema> = self.schemas.values().collect();
        ours.sort_by(|a, b| a.name.cmp(&b.name));
        outgoing.extend(ours.into_iter().cloned());

        match mode {
            RuntimeMode::Development => {
                let guilds = client.known_guilds().await;
                info!("Setting {} application commands in {} guilds", outgoing.len(), guilds.len());

                let mut written = 0;
                for guild in guilds {
                    match client.overwrite_commands(CommandScope::Guild(guild), &outgoing).await {
                        Ok(count) => {
                            info!("Overwrote {} application commands in guild {}", count, guild);
                            written += 1;
                        }
                        Err(e) => {
                            error!("Unable to overwrite application commands in guild {}: {e}", guild);
                            return written;
                        }
                    }
                }
                written
            }
            RuntimeMode::Production => match client.overwrite_commands(CommandScope::Global, &outgoing).await {
                Ok(count) => {
                    info!("Overwrote {} global application commands", count);
                    1
                }
                Err(e) => {
                    error!("Unable to register application commands: {e}");
                    0
                }
            },
        }
    }

    /// Removes every application command registered in one guild.
    pub async fn clear_guild_schemas(&self, client: &dyn ChatClient, guild: GuildId) -> usize {
        let scope = CommandScope::Guild(guild);
        let remote = match client.fetch_commands(scope).await {
            Ok(remote) => remote,
            Err(e) => {
                error!("Error getting application commands for guild {}: {e}", guild);
                return 0;
            }
        };

        let mut deleted = 0;
        for command in remote {
            match client.delete_command(scope, command.id).await {
                Ok(()) => deleted += 1,
                Err(e) => error!("Error deleting application command {} ({}): {e}", command.schema.name, command.id),
            }
        }
        deleted
    }
}
