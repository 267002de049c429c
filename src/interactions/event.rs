//! Platform-independent model of inbound interaction events
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! The serenity adapter in `platform::discord` converts gateway interactions
//! into these types, which keeps the dispatcher testable without a gateway.

use serde_json::Value;
use serenity::model::application::command::{CommandOptionType, CommandType};
use serenity::model::id::{ChannelId, CommandId, GuildId, MessageId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::HashMap;
use std::fmt;

/// Kind of application command, as declared and as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ChatInput,
    User,
    Message,
}

impl CommandKind {
    pub fn to_serenity(self) -> CommandType {
        match self {
            CommandKind::ChatInput => CommandType::ChatInput,
            CommandKind::User => CommandType::User,
            CommandKind::Message => CommandType::Message,
        }
    }

    pub fn from_serenity(kind: CommandType) -> Option<Self> {
        match kind {
            CommandType::ChatInput => Some(CommandKind::ChatInput),
            CommandType::User => Some(CommandKind::User),
            CommandType::Message => Some(CommandKind::Message),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::ChatInput => write!(f, "chat input"),
            CommandKind::User => write!(f, "user context menu"),
            CommandKind::Message => write!(f, "message context menu"),
        }
    }
}

/// Kind of a command option (or subcommand level) on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    /// Only free-form text and numeric options can be autocompleted
    pub fn supports_autocomplete(self) -> bool {
        matches!(
            self,
            OptionKind::String | OptionKind::Integer | OptionKind::Number
        )
    }

    pub fn to_serenity(self) -> CommandOptionType {
        match self {
            OptionKind::SubCommand => CommandOptionType::SubCommand,
            OptionKind::SubCommandGroup => CommandOptionType::SubCommandGroup,
            OptionKind::String => CommandOptionType::String,
            OptionKind::Integer => CommandOptionType::Integer,
            OptionKind::Boolean => CommandOptionType::Boolean,
            OptionKind::User => CommandOptionType::User,
            OptionKind::Channel => CommandOptionType::Channel,
            OptionKind::Role => CommandOptionType::Role,
            OptionKind::Mentionable => CommandOptionType::Mentionable,
            OptionKind::Number => CommandOptionType::Number,
            OptionKind::Attachment => CommandOptionType::Attachment,
        }
    }

    pub fn from_serenity(kind: CommandOptionType) -> Option<Self> {
        Some(match kind {
            CommandOptionType::SubCommand => OptionKind::SubCommand,
            CommandOptionType::SubCommandGroup => OptionKind::SubCommandGroup,
            CommandOptionType::String => OptionKind::String,
            CommandOptionType::Integer => OptionKind::Integer,
            CommandOptionType::Boolean => OptionKind::Boolean,
            CommandOptionType::User => OptionKind::User,
            CommandOptionType::Channel => OptionKind::Channel,
            CommandOptionType::Role => OptionKind::Role,
            CommandOptionType::Mentionable => OptionKind::Mentionable,
            CommandOptionType::Number => OptionKind::Number,
            CommandOptionType::Attachment => OptionKind::Attachment,
            _ => return None,
        })
    }
}

/// One option value (or subcommand level) of an inbound command
#[derive(Debug, Clone, PartialEq)]
pub struct OptionData {
    pub name: String,
    pub kind: OptionKind,
    pub value: Option<Value>,
    pub options: Vec<OptionData>,
    pub focused: bool,
}

impl OptionData {
    pub fn value(name: &str, kind: OptionKind, value: Value) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value: Some(value),
            options: Vec::new(),
            focused: false,
        }
    }

    pub fn subcommand(name: &str, options: Vec<OptionData>) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::SubCommand,
            value: None,
            options,
            focused: false,
        }
    }

    pub fn group(name: &str, subcommand: OptionData) -> Self {
        Self {
            name: name.to_string(),
            kind: OptionKind::SubCommandGroup,
            value: None,
            options: vec![subcommand],
            focused: false,
        }
    }

    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

/// Who triggered an interaction, and with which guild permissions
#[derive(Debug, Clone, PartialEq)]
pub struct Invoker {
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    /// Resolved member permissions; `None` outside guilds
    pub permissions: Option<Permissions>,
}

/// A command invocation or autocomplete request
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInteraction {
    pub command_id: CommandId,
    pub name: String,
    pub kind: CommandKind,
    pub options: Vec<OptionData>,
    /// Target user or message of a context menu command
    pub target_id: Option<u64>,
    pub invoker: Invoker,
    pub channel_id: ChannelId,
}

/// Concrete flavor of a message component activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Button,
    SelectMenu,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInteraction {
    pub custom_id: String,
    pub kind: ComponentKind,
    /// Selected values of a select menu
    pub values: Vec<String>,
    pub invoker: Invoker,
    pub channel_id: ChannelId,
    pub message_id: Option<MessageId>,
}

/// Submitted text inputs of a modal, keyed by input custom id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModalFields(HashMap<String, String>);

impl ModalFields {
    pub fn get(&self, custom_id: &str) -> Option<&str> {
        self.0.get(custom_id).map(String::as_str)
    }

    pub fn insert(&mut self, custom_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(custom_id.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModalFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalInteraction {
    pub custom_id: String,
    pub fields: ModalFields,
    pub invoker: Invoker,
    pub channel_id: ChannelId,
}

/// One inbound interaction, classified by kind
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    Command(CommandInteraction),
    Autocomplete(CommandInteraction),
    Component(ComponentInteraction),
    Modal(ModalInteraction),
}

impl InteractionEvent {
    /// Short description for logs and error reports
    pub fn label(&self) -> String {
        match self {
            InteractionEvent::Command(cmd) => format!("command '{}'", cmd.name),
            InteractionEvent::Autocomplete(cmd) => format!("autocomplete for '{}'", cmd.name),
            InteractionEvent::Component(c) => format!("component '{}'", c.custom_id),
            InteractionEvent::Modal(m) => format!("modal '{}'", m.custom_id),
        }
    }

    pub fn invoker(&self) -> &Invoker {
        match self {
            InteractionEvent::Command(cmd) | InteractionEvent::Autocomplete(cmd) => &cmd.invoker,
            InteractionEvent::Component(c) => &c.invoker,
            InteractionEvent::Modal(m) => &m.invoker,
        }
    }
}
