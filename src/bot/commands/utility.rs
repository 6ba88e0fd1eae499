use serenity::all::ChannelId;

use crate::bot::{
    arguments::arguments::{ArgInfo, ArgType},
    commands::{commands::{Command, CommandInfo, MODERATION, UTILITY}, RegistryBuilder},
    permissions::permissions::PermissionLevel,
};

/// Registers the built-in commands and asks for their interaction schemas.
pub fn register(builder: &mut RegistryBuilder) {
    for command in [ping_command(), help_command(), config_command()] {
        builder.register_interaction_schema(&command.info);
        builder.register(command);
    }

    builder
        .register_child(config_get_command())
        .register_child(config_set_command())
        .register_child(config_unpublish_command());
}

pub fn ping_command() -> Command {
    let info = CommandInfo::new("ping", "Check that the bot is alive").aliases(["pong"]).group(UTILITY).public().typing();
    Command::new(info, |ctx| {
        Box::pin(async move {
            ctx.reply("Pong!").await
        })
    })
}

pub fn help_command() -> Command {
    let info = CommandInfo::new("help", "List commands or describe one")
        .aliases(["commands"])
        .public()
        .arg(ArgInfo::new("command", ArgType::String, "Command to describe"));

    Command::new(info, |ctx| {
        Box::pin(async move {
            let commands = ctx.registry.list_public_info();
            let prefix = ctx.guild.config().await.prefix;

            let text = match ctx.args.string("command") {
                Some(name) => match ctx.registry.resolve(name) {
                    Some(cmd) => {
                        let mut text = format!("**{}{}** ({}): {}", prefix, cmd.info.trigger, cmd.info.group, cmd.info.description);
                        let aliases: Vec<&str> = cmd.info.aliases.iter().filter(|a| **a != cmd.info.trigger).map(String::as_str).collect();
                        if !aliases.is_empty() {
                            text.push_str(&format!("\nAliases: {}", aliases.join(", ")));
                        }
                        for arg in &cmd.info.arguments {
                            let req = if arg.required { "required" } else { "optional" };
                            text.push_str(&format!("\n`{}` {} ({}): {}", arg.name, arg.kind, req, arg.description));
                        }
                        text
                    }
                    None => format!("No command named '{}'", name),
                },
                None => {
                    let mut visible: Vec<_> = commands.values().filter(|c| c.public).collect();
                    visible.sort_by(|a, b| a.trigger.cmp(&b.trigger));
                    let lines: Vec<String> = visible.iter().map(|c| format!("{}{} - {}", prefix, c.trigger, c.description)).collect();
                    format!("Available commands:\n{}", lines.join("\n"))
                }
            };

            ctx.reply(&text).await
        })
    })
}

pub fn config_command() -> Command {
    let info = CommandInfo::new("config", "Show or change this server's bot settings").group(MODERATION).public().parent();
    Command::new(info, |ctx| {
        Box::pin(async move {
            let prefix = ctx.guild.config().await.prefix;
            ctx.reply(&format!("Usage: {p}config get | {p}config set <prefix|channel> <value>", p = prefix)).await
        })
    })
}

pub fn config_get_command() -> Command {
    let info = CommandInfo::new("get", "Show the current settings").child_of("config").public();
    Command::new(info, |ctx| {
        Box::pin(async move {
            let cfg = ctx.guild.config().await;
            let channel = cfg.response_channel_id.map(|c| format!("<#{}>", c)).unwrap_or_else(|| "same channel".to_string());
            ctx.reply(&format!("Prefix: `{}`\nResponses: {}\nModerators: {}", cfg.prefix, channel, cfg.moderators.len())).await
        })
    })
}

pub fn config_set_command() -> Command {
    let info = CommandInfo::new("set", "Change a setting")
        .child_of("config")
        .arg(ArgInfo::new("key", ArgType::String, "Setting to change").required().choices(["prefix", "channel"]))
        .arg(ArgInfo::new("value", ArgType::String, "New value, or 'none' to clear the channel").required());

    Command::new(info, |ctx| {
        Box::pin(async move {
            if !ctx.invoker_has(PermissionLevel::Moderator).await {
                return ctx.reply("Only moderators can change settings").await;
            }

            let (Some(key), Some(value)) = (ctx.args.string("key"), ctx.args.string("value")) else {
                return ctx.reply("Usage: config set <prefix|channel> <value>").await;
            };

            match key {
                "prefix" => {
                    let prefix = value.trim().to_string();
                    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
                        return ctx.reply("Prefix must be non-empty and contain no spaces").await;
                    }
                    ctx.guild.update(|cfg| cfg.prefix = prefix.clone()).await;
                    ctx.reply(&format!("Prefix set to `{}`", prefix)).await
                }
                "channel" => {
                    let channel = if value.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        match parse_channel(value) {
                            Some(id) => Some(id),
                            None => return ctx.reply("Expected a channel mention or 'none'").await,
                        }
                    };
                    ctx.guild.update(|cfg| cfg.response_channel_id = channel).await;
                    ctx.reply("Response channel updated").await
                }
                other => ctx.reply(&format!("Unknown setting '{}'", other)).await,
            }
        })
    })
}

/// Removes this guild's application commands. Bot admins only.
pub fn config_unpublish_command() -> Command {
    let info = CommandInfo::new("unpublish", "Remove this server's slash commands").child_of("config");
    Command::new(info, |ctx| {
        Box::pin(async move {
            if !ctx.invoker_has(PermissionLevel::Admin).await {
                return Ok(());
            }
            let Some(guild) = ctx.guild.id else {
                return ctx.reply("Only available in a server").await;
            };

            let deleted = ctx.registry.clear_guild_schemas(ctx.client.as_ref(), guild).await;
            ctx.reply(&format!("Removed {} application commands", deleted)).await
        })
    })
}

fn parse_channel(raw: &str) -> Option<ChannelId> {
    let digits = raw.trim().trim_start_matches("<#").trim_end_matches('>');
    digits.parse::<u64>().ok().filter(|id| *id != 0).map(ChannelId::new)
}
