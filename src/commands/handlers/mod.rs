//! Bundled command and component handlers
//!
//! - **Version**: 3.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 3.0.0: Replace the handler list with declared commands and component registrations
//! - 2.0.0: Consolidate handlers per feature
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod subscription;
pub mod utility;

use crate::commands::registry::CommandSet;
use crate::core::error::DeclarationError;
use crate::features::subscriptions::SubscriptionService;
use crate::interactions::components::ComponentRegistries;

/// Compile every bundled command and register the components they use
///
/// Any declaration error is fatal; the bot must not start half-registered.
pub fn create_bundled(
    service: &SubscriptionService,
) -> Result<(CommandSet, ComponentRegistries), DeclarationError> {
    let mut components = ComponentRegistries::new();
    let mut commands = CommandSet::new();

    commands.add(utility::declare().compile()?)?;
    commands.add(subscription::declare(service, &mut components)?.compile()?)?;

    Ok((commands, components))
}
