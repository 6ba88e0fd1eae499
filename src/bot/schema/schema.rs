use serde::{Deserialize, Serialize};
use serenity::all::{CommandId, CommandOptionType, CommandType, CreateCommand, CreateCommandOption};
use tracing::debug;

use crate::bot::{arguments::arguments::{ArgInfo, ArgType}, commands::commands::CommandInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum CommandKind {
    #[default]
    ChatInput,
    /// Context-menu entry on a user.
    User,
    /// Context-menu entry on a message.
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OptionSchema {
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub choices: Vec<OptionChoice>,
    pub options: Vec<OptionSchema>,
}

/// Platform-native description of one application command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    pub kind: CommandKind,
    pub options: Vec<OptionSchema>,
}

/// A command as currently registered on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub schema: CommandSchema,
}

pub fn option_kind(kind: &ArgType) -> OptionKind {
    match kind {
        ArgType::Int => OptionKind::Integer,
        ArgType::String => OptionKind::String,
        ArgType::Channel => OptionKind::Channel,
        ArgType::User => OptionKind::User,
        ArgType::Role => OptionKind::Role,
        ArgType::Boolean => OptionKind::Boolean,
        ArgType::SubCmd => OptionKind::SubCommand,
        ArgType::SubCmdGrp => OptionKind::SubCommandGroup,
        ArgType::Other(_) => OptionKind::String,
    }
}

fn argument_option(arg: &ArgInfo) -> OptionSchema {
    OptionSchema {
        kind: option_kind(&arg.kind),
        name: arg.name.clone(),
        description: arg.description.clone(),
        required: arg.required,
        choices: arg
            .choices
            .iter()
            .flatten()
            .map(|c| OptionChoice { name: c.clone(), value: c.clone() })
            .collect(),
        options: Vec::new(),
    }
}

/// Flat schema for a leaf command. Options keep descriptor order.
pub fn synthesize(info: &CommandInfo) -> CommandSchema {
    CommandSchema {
        name: info.trigger.clone(),
        description: info.description.clone(),
        kind: CommandKind::ChatInput,
        options: info.arguments.iter().map(argument_option).collect(),
    }
}

/// Schema for a parent command; every child becomes one sub-command option.
///
/// Only one level of nesting is produced. A child whose first argument is a
/// sub-command group would need a second level and is left out.
pub fn synthesize_parent<'a, I>(info: &CommandInfo, children: I) -> CommandSchema
where
    I: IntoIterator<Item = &'a CommandInfo>,
{
    let mut children: Vec<&CommandInfo> = children.into_iter().collect();
    children.sort_by(|a, b| a.trigger.cmp(&b.trigger));

    let options = children
        .into_iter()
        .filter(|child| {
            let nested = matches!(child.arguments.first(), Some(first) if first.kind == ArgType::SubCmdGrp);
            if nested {
                debug!("Skipping sub-command group '{}' under '{}'", child.trigger, info.trigger);
            }
            !nested
        })
        .map(|child| OptionSchema {
            kind: OptionKind::SubCommand,
            name: child.trigger.clone(),
            description: child.description.clone(),
            required: false,
            choices: Vec::new(),
            options: child.arguments.iter().filter(|a| !a.kind.is_subcommand()).map(argument_option).collect(),
        })
        .collect();

    CommandSchema {
        name: info.trigger.clone(),
        description: info.description.clone(),
        kind: CommandKind::ChatInput,
        options,
    }
}

impl From<OptionKind> for CommandOptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::SubCommand => CommandOptionType::SubCommand,
            OptionKind::SubCommandGroup => CommandOptionType::SubCommandGroup,
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
        }
    }
}

impl From<CommandKind> for CommandType {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ChatInput => CommandType::ChatInput,
            CommandKind::User => CommandType::User,
            CommandKind::Message => CommandType::Message,
        }
    }
}

impl CommandSchema {
    /// Name-only schema for a context-menu command.
    pub fn context_menu(name: impl Into<String>, kind: CommandKind) -> Self {
        Self { name: name.into(), description: String::new(), kind, options: Vec::new() }
    }

    pub fn to_create_command(&self) -> CreateCommand {
        let mut command = CreateCommand::new(&self.name).kind(self.kind.into());
        // Context-menu commands must not carry a description.
        if self.kind == CommandKind::ChatInput {
            command = command.description(&self.description);
        }
        for option in &self.options {
            command = command.add_option(option.to_create_option());
        }
        command
    }
}

impl OptionSchema {
    fn to_create_option(&self) -> CreateCommandOption {
        let mut option = CreateCommandOption::new(self.kind.into(), &self.name, &self.description).required(self.required);
        for choice in &self.choices {
            option = option.add_string_choice(&choice.name, &choice.value);
        }
        for sub in &self.options {
            option = option.add_sub_option(sub.to_create_option());
        }
        option
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_command_keeps_descriptor_order() {
        let info = CommandInfo::new("ban", "Ban a member")
            .arg(ArgInfo::new("days", ArgType::Int, "Days of messages to delete").required())
            .arg(ArgInfo::new("mode", ArgType::String, "How").choices(["soft", "hard"]));

        let schema = synthesize(&info);
        assert_eq!(schema.name, "ban");
        assert_eq!(schema.options.len(), 2);

        let days = &schema.options[0];
        assert_eq!(days.name, "days");
        assert_eq!(days.kind, OptionKind::Integer);
        assert!(days.required);
        assert!(days.choices.is_empty());

        let mode = &schema.options[1];
        assert_eq!(mode.kind, OptionKind::String);
        assert!(!mode.required);
        assert_eq!(mode.choices.len(), 2);
        assert_eq!(mode.choices[1], OptionChoice { name: "hard".into(), value: "hard".into() });
    }

    #[test]
    fn unknown_tag_falls_back_to_string() {
        let info = CommandInfo::new("poke", "Poke").arg(ArgInfo::new("who", ArgType::Other("mentionable".into()), "w"));
        assert_eq!(synthesize(&info).options[0].kind, OptionKind::String);
    }

    #[test]
    fn parent_lists_children_and_skips_groups() {
        let parent = CommandInfo::new("config", "Configure").parent();
        let set = CommandInfo::new("set", "Set").child_of("config").arg(ArgInfo::new("value", ArgType::String, "v").required());
        let get = CommandInfo::new("get", "Get").child_of("config");
        let group = CommandInfo::new("perm", "Perms").child_of("config").arg(ArgInfo::new("grp", ArgType::SubCmdGrp, "g"));

        let schema = synthesize_parent(&parent, [&set, &group, &get]);
        let names: Vec<&str> = schema.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["get", "set"]);
        assert!(schema.options.iter().all(|o| o.kind == OptionKind::SubCommand));
        assert_eq!(schema.options[1].options[0].name, "value");
        assert!(schema.options[1].options[0].required);
    }

    #[test]
    fn converts_to_serenity_builder() {
        let info = CommandInfo::new("ping", "Pong").arg(ArgInfo::new("loud", ArgType::Boolean, "l"));
        let json = serde_json::to_value(synthesize(&info).to_create_command()).unwrap();
        assert_eq!(json["name"], "ping");
        assert_eq!(json["description"], "Pong");
        assert_eq!(json["options"].as_array().map(Vec::len), Some(1));
    }
}
