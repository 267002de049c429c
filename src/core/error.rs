//! Error taxonomy for the interaction framework and the expiry scheduler
//!
//! - **Version**: 1.0.0
//! - **Since**: 2.0.0
//!
//! Declaration errors are fatal at startup. Identity and dispatch errors are
//! recovered per event by the dispatcher. Scheduler errors are logged only.

use serenity::model::permissions::Permissions;
use thiserror::Error;

use crate::features::subscriptions::SubscriberId;
use crate::interactions::event::CommandKind;
use crate::interactions::identity::Scope;

/// Ill-formed declarations and duplicate registrations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("duplicate {registry} registration: '{name}'")]
    DuplicateName { registry: &'static str, name: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("'{path}' needs a description of 1-100 characters")]
    InvalidDescription { path: String },

    #[error("'{0}' mixes options and subcommands at the same level")]
    MixedOptionsAndSubcommands(String),

    #[error("'{0}' declares neither a handler nor subcommands")]
    MissingHandler(String),

    #[error("'{0}' is a subcommand branch and cannot have its own handler")]
    HandlerOnBranch(String),

    #[error("option '{option}' of '{path}' is invalid: {reason}")]
    InvalidOption {
        path: String,
        option: String,
        reason: &'static str,
    },

    #[error("'{0}' exceeds the limit of 25 options or subcommands")]
    TooManyEntries(String),

    #[error("context menu command '{0}' cannot declare options or subcommands")]
    ContextMenuOptions(String),

    #[error("command '{0}' was not assigned an id by the platform")]
    NotRegistered(String),
}

/// Failures encoding or decoding an identity string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no {scope} handler registered under '{name}'")]
    Unregistered { scope: Scope, name: String },

    #[error("invalid identity '{raw}': {reason}")]
    Invalid { raw: String, reason: &'static str },

    #[error("identity is {len} characters, the limit is {limit}")]
    TooLong { len: usize, limit: usize },
}

/// Everything that can go wrong while routing one inbound interaction
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no command registered with id {0}")]
    CommandNotFound(u64),

    #[error("command '{name}' is declared as {declared} but arrived as {received}")]
    CommandTypeMismatch {
        name: String,
        declared: CommandKind,
        received: CommandKind,
    },

    #[error("subcommand group '{group}' not found on '{command}'")]
    SubcommandGroupNotFound { command: String, group: String },

    #[error("subcommand '{subcommand}' not found on '{command}'")]
    SubcommandNotFound { command: String, subcommand: String },

    #[error("option '{option}' on '{command}' has no autocomplete handler")]
    OptionNotAutocompletable { command: String, option: String },

    #[error("invalid value for option '{option}': {reason}")]
    InvalidOptionValue { option: String, reason: String },

    #[error("invoker lacks required permissions {required:?}")]
    NoPermission { required: Permissions },

    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),

    #[error("no {scope} handler named '{name}'")]
    HandlerNotFound { scope: Scope, name: String },

    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

impl DispatchError {
    /// Authorization failures are answered but never reported as faults
    pub fn is_authorization(&self) -> bool {
        matches!(self, DispatchError::NoPermission { .. })
    }
}

/// Failures while delivering an expiry notification
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("subscriber {0} no longer exists")]
    SubscriberNotFound(SubscriberId),

    #[error("failed to load subscriber {id}: {cause:#}")]
    Store { id: SubscriberId, cause: anyhow::Error },

    #[error("failed to send expiry notification for {id}: {cause:#}")]
    Notification { id: SubscriberId, cause: anyhow::Error },
}
