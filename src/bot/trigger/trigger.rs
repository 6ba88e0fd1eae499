use once_cell::sync::Lazy;
use regex::Regex;
use serenity::all::UserId;

use crate::bot::{commands::commands::normalize, guild::guild::GuildConfig};

static MENTION_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?(\d+)>\s*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Normalized; still needs alias resolution.
    pub trigger: String,
    pub remainder: String,
}

/// Recognizes `<prefix><trigger> ...` or `@bot <trigger> ...`.
pub fn extract_command(cfg: &GuildConfig, bot_id: Option<UserId>, content: &str) -> Option<Invocation> {
    let content = content.trim_start();

    let rest = if let Some(rest) = content.strip_prefix(cfg.prefix.as_str()) {
        rest
    } else if let Some(caps) = MENTION_PREFIX.captures(content) {
        let mentioned = caps.get(1)?.as_str().parse::<u64>().ok()?;
        if bot_id.map(UserId::get) != Some(mentioned) {
            return None;
        }
        &content[caps.get(0)?.end()..]
    } else {
        return None;
    };

    let (trigger, remainder) = match rest.split_once(char::is_whitespace) {
        Some((trigger, remainder)) => (trigger, remainder.trim()),
        None => (rest, ""),
    };

    if trigger.is_empty() {
        return None;
    }

    Some(Invocation { trigger: normalize(trigger), remainder: remainder.to_string() })
}
