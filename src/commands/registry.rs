//! Command registry keyed by platform-assigned id
//!
//! - **Version**: 2.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.1.0: A failed registration leaves the set pending so it can be retried
//! - 2.0.0: Key by command id after schema registration; duplicate names are fatal
//! - 1.0.0: Initial implementation for handler dispatch

use dashmap::DashMap;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::id::CommandId;
use std::collections::HashMap;
use std::sync::Arc;

use super::compile::CompiledCommand;
use crate::core::error::DeclarationError;
use crate::platform::Platform;

/// Compiled commands awaiting registration, unique by name
#[derive(Default)]
pub struct CommandSet {
    commands: Vec<CompiledCommand>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compiled command; a second command with the same name is rejected
    pub fn add(&mut self, command: CompiledCommand) -> Result<(), DeclarationError> {
        if self.contains(command.name()) {
            return Err(DeclarationError::DuplicateName {
                registry: "command",
                name: command.name().to_string(),
            });
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|cmd| cmd.name() == name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Wire schemas of every command, in insertion order
    pub fn schemas(&self) -> Vec<CreateApplicationCommand> {
        self.commands.iter().map(|cmd| cmd.schema().clone()).collect()
    }
}

/// Registry mapping platform command ids to compiled commands
///
/// # Example
///
/// ```ignore
/// let registry = CommandRegistry::new();
/// register_commands(platform.as_ref(), &mut set, &registry).await?;
///
/// if let Some(command) = registry.get(interaction.command_id) {
///     command.dispatch(invocation).await?;
/// }
/// ```
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: Arc<DashMap<CommandId, Arc<CompiledCommand>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move every command in `set` into the registry under the id the
    /// platform assigned its name
    ///
    /// Fails without installing anything, and with `set` untouched, if a
    /// name has no id.
    pub fn install(
        &self,
        set: &mut CommandSet,
        ids: &HashMap<String, CommandId>,
    ) -> Result<usize, DeclarationError> {
        if let Some(missing) = set.commands.iter().find(|cmd| !ids.contains_key(cmd.name())) {
            return Err(DeclarationError::NotRegistered(missing.name().to_string()));
        }

        let count = set.commands.len();
        for command in set.commands.drain(..) {
            if let Some(id) = ids.get(command.name()) {
                self.commands.insert(*id, Arc::new(command));
            }
        }
        Ok(count)
    }

    pub fn get(&self, id: CommandId) -> Option<Arc<CompiledCommand>> {
        self.commands.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.commands.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered command names, sorted
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .iter()
            .map(|entry| entry.value().name().to_string())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Register every schema with the platform, then install the returned ids
///
/// On success `set` is left empty. On failure it keeps every command, so the
/// caller can retry later.
pub async fn register_commands(
    platform: &dyn Platform,
    set: &mut CommandSet,
    registry: &CommandRegistry,
) -> anyhow::Result<usize> {
    let ids = platform.register_command_schemas(set.schemas()).await?;
    let count = registry.install(set, &ids)?;
    info!("Registered {} application commands", count);
    Ok(count)
}
