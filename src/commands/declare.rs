//! # Command Declarations
//!
//! Declarative descriptions of commands, subcommands, groups and options.
//! A declaration is inert until compiled into a `CompiledCommand`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ```ignore
//! let status = CommandDecl::slash("subscription", "Manage your subscription")
//!     .subcommand(
//!         SubcommandDecl::new("link", "Link your Discord account")
//!             .option(OptionDecl::string("email", "Billing email").required(true))
//!             .handler(LinkHandler::new(service.clone())),
//!     )
//!     .subcommand(SubcommandDecl::new("status", "Show your subscription").handler(StatusHandler))
//!     .compile()?;
//! ```

use serenity::model::channel::ChannelType;
use serenity::model::permissions::Permissions;
use std::sync::Arc;

use super::args::FromArgs;
use super::handler::{erase, AutocompleteHandler, CommandHandler, ErasedHandler};
use crate::interactions::event::{CommandKind, OptionKind};

/// A fixed choice offered for an option
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    String { name: String, value: String },
    Integer { name: String, value: i32 },
    Number { name: String, value: f64 },
}

impl Choice {
    /// Option kind the choice value belongs to
    pub(crate) fn kind(&self) -> OptionKind {
        match self {
            Choice::String { .. } => OptionKind::String,
            Choice::Integer { .. } => OptionKind::Integer,
            Choice::Number { .. } => OptionKind::Number,
        }
    }
}

/// One typed option of a command leaf
#[derive(Clone)]
pub struct OptionDecl {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) kind: OptionKind,
    pub(crate) required: bool,
    pub(crate) min_length: Option<u16>,
    pub(crate) max_length: Option<u16>,
    pub(crate) min_value: Option<f64>,
    pub(crate) max_value: Option<f64>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) channel_types: Vec<ChannelType>,
    pub(crate) autocomplete: Option<Arc<dyn AutocompleteHandler>>,
}

impl OptionDecl {
    fn new(name: &str, description: &str, kind: OptionKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: false,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            choices: Vec::new(),
            channel_types: Vec::new(),
            autocomplete: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::String)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Integer)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Number)
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Boolean)
    }

    pub fn user(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::User)
    }

    pub fn channel(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Channel)
    }

    pub fn role(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Role)
    }

    pub fn mentionable(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Mentionable)
    }

    pub fn attachment(name: &str, description: &str) -> Self {
        Self::new(name, description, OptionKind::Attachment)
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn min_length(mut self, length: u16) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: u16) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn min_value(mut self, value: f64) -> Self {
        self.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: f64) -> Self {
        self.max_value = Some(value);
        self
    }

    pub fn string_choice(mut self, name: &str, value: &str) -> Self {
        self.choices.push(Choice::String {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn int_choice(mut self, name: &str, value: i32) -> Self {
        self.choices.push(Choice::Integer {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn number_choice(mut self, name: &str, value: f64) -> Self {
        self.choices.push(Choice::Number {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Restrict a channel option to the given channel types
    pub fn channel_types(mut self, types: &[ChannelType]) -> Self {
        self.channel_types.extend_from_slice(types);
        self
    }

    /// Route autocomplete requests for this option to `handler`
    pub fn autocomplete(mut self, handler: Arc<dyn AutocompleteHandler>) -> Self {
        self.autocomplete = Some(handler);
        self
    }
}

/// A subcommand: always a leaf
#[derive(Clone)]
pub struct SubcommandDecl {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) options: Vec<OptionDecl>,
    pub(crate) handler: Option<ErasedHandler>,
}

impl SubcommandDecl {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            options: Vec::new(),
            handler: None,
        }
    }

    pub fn option(mut self, option: OptionDecl) -> Self {
        self.options.push(option);
        self
    }

    pub fn handler<A, H>(mut self, handler: H) -> Self
    where
        A: FromArgs,
        H: CommandHandler<A>,
    {
        self.handler = Some(erase(handler));
        self
    }
}

/// A named group of subcommands
#[derive(Clone)]
pub struct GroupDecl {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) subcommands: Vec<SubcommandDecl>,
}

impl GroupDecl {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            subcommands: Vec::new(),
        }
    }

    pub fn subcommand(mut self, subcommand: SubcommandDecl) -> Self {
        self.subcommands.push(subcommand);
        self
    }
}

/// Child of a branch command, kept in declaration order
#[derive(Clone)]
pub(crate) enum Child {
    Subcommand(SubcommandDecl),
    Group(GroupDecl),
}

impl Child {
    pub(crate) fn name(&self) -> &str {
        match self {
            Child::Subcommand(sub) => &sub.name,
            Child::Group(group) => &group.name,
        }
    }
}

/// A top-level command: a leaf with options and a handler, or a branch of
/// subcommands and groups
#[derive(Clone)]
pub struct CommandDecl {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) kind: CommandKind,
    pub(crate) options: Vec<OptionDecl>,
    pub(crate) handler: Option<ErasedHandler>,
    pub(crate) children: Vec<Child>,
    pub(crate) permissions: Option<Permissions>,
    pub(crate) dm_permission: Option<bool>,
}

impl CommandDecl {
    fn new(name: &str, description: &str, kind: CommandKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            options: Vec::new(),
            handler: None,
            children: Vec::new(),
            permissions: None,
            dm_permission: None,
        }
    }

    /// A chat input (slash) command
    pub fn slash(name: &str, description: &str) -> Self {
        Self::new(name, description, CommandKind::ChatInput)
    }

    /// A user context menu command
    pub fn user(name: &str) -> Self {
        Self::new(name, "", CommandKind::User)
    }

    /// A message context menu command
    pub fn message(name: &str) -> Self {
        Self::new(name, "", CommandKind::Message)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn option(mut self, option: OptionDecl) -> Self {
        self.options.push(option);
        self
    }

    pub fn handler<A, H>(mut self, handler: H) -> Self
    where
        A: FromArgs,
        H: CommandHandler<A>,
    {
        self.handler = Some(erase(handler));
        self
    }

    pub fn subcommand(mut self, subcommand: SubcommandDecl) -> Self {
        self.children.push(Child::Subcommand(subcommand));
        self
    }

    pub fn group(mut self, group: GroupDecl) -> Self {
        self.children.push(Child::Group(group));
        self
    }

    /// Permissions a member needs; written to the schema and checked before
    /// the handler runs
    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = Some(allowed);
        self
    }
}
