use core::fmt;
use std::{collections::HashMap, convert::Infallible, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, RoleId, UserId};
use tracing::debug;

use crate::bot::chat_event::chat_event::{InteractionOption, OptionValue};

static USER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?(\d+)>$").unwrap());
static CHANNEL_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<#(\d+)>$").unwrap());
static ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@&(\d+)>$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ArgType {
    Int,
    String,
    Channel,
    User,
    Role,
    Boolean,
    SubCmd,
    SubCmdGrp,
    /// A tag this crate does not know. Treated as a string everywhere.
    Other(String),
}

/// Describes one argument a command accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArgInfo {
    pub name: String,
    pub description: String,
    pub kind: ArgType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Number(f64),
    String(String),
    Bool(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
}

/// Parsed arguments, queried by descriptor name. Missing means absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: HashMap<String, ArgValue>,
}

impl FromStr for ArgType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "int" | "integer" => ArgType::Int,
            "string" | "str" => ArgType::String,
            "channel" => ArgType::Channel,
            "user" => ArgType::User,
            "role" => ArgType::Role,
            "bool" | "boolean" => ArgType::Boolean,
            "subcmd" | "subcommand" => ArgType::SubCmd,
            "subcmdgrp" | "subcommandgroup" => ArgType::SubCmdGrp,
            _ => ArgType::Other(s.to_string()),
        })
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArgType::Int => "int",
            ArgType::String => "string",
            ArgType::Channel => "channel",
            ArgType::User => "user",
            ArgType::Role => "role",
            ArgType::Boolean => "boolean",
            ArgType::SubCmd => "subcmd",
            ArgType::SubCmdGrp => "subcmdgrp",
            ArgType::Other(tag) => tag.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl ArgType {
    pub fn is_subcommand(&self) -> bool {
        matches!(self, ArgType::SubCmd | ArgType::SubCmdGrp)
    }

    fn is_text(&self) -> bool {
        matches!(self, ArgType::String | ArgType::Other(_))
    }
}

impl ArgInfo {
    pub fn new(name: impl Into<String>, kind: ArgType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            choices: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    fn convert(&self, raw: &str) -> Option<ArgValue> {
        if let Some(choices) = &self.choices {
            let picked = choices.iter().find(|c| c.eq_ignore_ascii_case(raw))?;
            return Some(ArgValue::String(picked.clone()));
        }

        match &self.kind {
            ArgType::Int => raw.parse().ok().map(ArgValue::Int),
            ArgType::String | ArgType::Other(_) => Some(ArgValue::String(raw.to_string())),
            ArgType::Boolean => parse_bool(raw).map(ArgValue::Bool),
            ArgType::User => snowflake(raw, &USER_MENTION).map(|id| ArgValue::User(UserId::new(id))),
            ArgType::Channel => snowflake(raw, &CHANNEL_MENTION).map(|id| ArgValue::Channel(ChannelId::new(id))),
            ArgType::Role => snowflake(raw, &ROLE_MENTION).map(|id| ArgValue::Role(RoleId::new(id))),
            ArgType::SubCmd | ArgType::SubCmdGrp => None,
        }
    }
}

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            ArgValue::Number(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<UserId> {
        match self.values.get(name)? {
            ArgValue::User(id) => Some(*id),
            _ => None,
        }
    }

    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        match self.values.get(name)? {
            ArgValue::Channel(id) => Some(*id),
            _ => None,
        }
    }

    pub fn role(&self, name: &str) -> Option<RoleId> {
        match self.values.get(name)? {
            ArgValue::Role(id) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }
}

struct Token {
    text: String,
    /// Byte offset just past the token, closing quote included.
    end: usize,
}

/// Splits on whitespace, keeping `"quoted runs"` together.
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut text = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                text.push(c);
            }
            if !closed {
                text.insert(0, '"');
            }
        } else {
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
        }

        let end = chars.peek().map_or(input.len(), |&(i, _)| i);
        tokens.push(Token { text, end });
    }

    tokens
}

/// Parses free text against the descriptors, in order.
///
/// Each descriptor takes one token, except a trailing string descriptor which
/// swallows the rest of the line. Only its first token is unquoted; the rest
/// is kept verbatim. Tokens that fail to convert leave their argument absent.
pub fn parse_text(input: &str, descriptors: &[ArgInfo]) -> Arguments {
    let tokens = tokenize(input);
    let positional: Vec<&ArgInfo> = descriptors.iter().filter(|d| !d.kind.is_subcommand()).collect();
    let mut args = Arguments::default();

    for (i, desc) in positional.iter().enumerate() {
        let Some(token) = tokens.get(i) else { break };

        let is_last = i + 1 == positional.len();
        let raw = if is_last && desc.kind.is_text() && desc.choices.is_none() && tokens.len() > i + 1 {
            format!("{}{}", token.text, &input[token.end..]).trim().to_string()
        } else {
            token.text.clone()
        };

        match desc.convert(&raw) {
            Some(value) => args.insert(desc.name.clone(), value),
            None => debug!("Argument '{}' rejected value '{}'", desc.name, raw),
        }
    }

    args
}

/// Flattens interaction options at any depth into one container.
pub fn parse_interaction(options: &[InteractionOption]) -> Arguments {
    let mut args = Arguments::default();
    flatten_into(options, &mut args);
    args
}

fn flatten_into(options: &[InteractionOption], args: &mut Arguments) {
    for option in options {
        let value = match &option.value {
            OptionValue::Int(v) => ArgValue::Int(*v),
            OptionValue::Number(v) => ArgValue::Number(*v),
            OptionValue::String(v) => ArgValue::String(v.clone()),
            OptionValue::Bool(v) => ArgValue::Bool(*v),
            OptionValue::User(id) => ArgValue::User(*id),
            OptionValue::Channel(id) => ArgValue::Channel(*id),
            OptionValue::Role(id) => ArgValue::Role(*id),
            OptionValue::Nested(nested) => {
                flatten_into(nested, args);
                continue;
            }
            OptionValue::Unsupported => continue,
        };
        args.insert(option.name.clone(), value);
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn snowflake(raw: &str, mention: &Regex) -> Option<u64> {
    let digits = match mention.captures(raw) {
        Some(caps) => caps.get(1)?.as_str(),
        None => raw,
    };
    digits.parse::<u64>().ok().filter(|id| *id != 0)
}
