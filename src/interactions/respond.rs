//! Responding to an interaction
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use serenity::model::application::component::ButtonStyle;

/// Discord's cap on autocomplete suggestions
pub const AUTOCOMPLETE_CHOICE_LIMIT: usize = 25;

/// A message reply, optionally carrying a row of buttons and a user picker
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
    pub buttons: Vec<ButtonSpec>,
    pub user_select: Option<UserSelectSpec>,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
            buttons: Vec::new(),
            user_select: None,
        }
    }

    /// Reply visible only to the invoker
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            ephemeral: true,
            ..Self::new(content)
        }
    }

    pub fn button(mut self, button: ButtonSpec) -> Self {
        self.buttons.push(button);
        self
    }

    /// Attach a user select menu on its own row
    pub fn user_select(mut self, menu: UserSelectSpec) -> Self {
        self.user_select = Some(menu);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonSpec {
    /// Usually an encoded identity string
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl ButtonSpec {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        }
    }
}

/// A select menu whose options are the guild's users
#[derive(Debug, Clone, PartialEq)]
pub struct UserSelectSpec {
    /// Usually an encoded `userSelect` identity
    pub custom_id: String,
    pub placeholder: Option<String>,
    pub min_values: u64,
    pub max_values: u64,
}

impl UserSelectSpec {
    /// Pick exactly one user
    pub fn new(custom_id: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            placeholder: None,
            min_values: 1,
            max_values: 1,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn values(mut self, min: u64, max: u64) -> Self {
        self.min_values = min;
        self.max_values = max.max(min);
        self
    }
}

/// A modal form shown in response to a command or component
#[derive(Debug, Clone, PartialEq)]
pub struct ModalForm {
    pub custom_id: String,
    pub title: String,
    pub fields: Vec<TextField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    pub custom_id: String,
    pub label: String,
    pub paragraph: bool,
    pub required: bool,
    pub placeholder: Option<String>,
    pub max_length: Option<u64>,
}

impl TextField {
    /// Required single-line input
    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            paragraph: false,
            required: true,
            placeholder: None,
            max_length: None,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn max_length(mut self, max_length: u64) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// One autocomplete suggestion (also used for static option choices)
#[derive(Debug, Clone, PartialEq)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: Value,
}

impl AutocompleteChoice {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::String(value.into()),
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: Value::from(value),
        }
    }

    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Value::from(value),
        }
    }
}

/// Outbound side of a single interaction
///
/// Implemented by the serenity adapter for live interactions and by recording
/// doubles in tests. `has_responded` must turn true after any successful
/// reply, defer, modal or autocomplete response.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send the initial response message
    async fn reply(&self, reply: Reply) -> Result<()>;

    /// Acknowledge now, respond later with `edit`
    async fn defer(&self, ephemeral: bool) -> Result<()>;

    /// Replace the content of the initial (or deferred) response
    async fn edit(&self, content: &str) -> Result<()>;

    async fn show_modal(&self, modal: ModalForm) -> Result<()>;

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<()>;

    fn has_responded(&self) -> bool;
}
