use std::collections::HashMap;

use crate::bot::{commands::commands::{Command, CommandInfo, Component}, schema::schema::CommandSchema};

pub mod commands;
pub mod registry;
pub mod utility;

pub type CommandMap = HashMap<String, Command>;
pub type ChildMap = HashMap<String, CommandMap>;

/// Write phase of the registry. Consumed by [`RegistryBuilder::seal`].
#[derive(Default)]
pub struct RegistryBuilder {
    commands: CommandMap,
    children: ChildMap,
    aliases: HashMap<String, String>,
    schema_requests: Vec<CommandInfo>,
    components: HashMap<String, Component>,
}

/// Read-only registry shared by every dispatched event.
pub struct CommandRegistry {
    commands: CommandMap,
    children: ChildMap,
    aliases: HashMap<String, String>,
    schemas: HashMap<String, CommandSchema>,
    components: HashMap<String, Component>,
}
