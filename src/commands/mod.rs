//! # Command System
//!
//! Declarative application commands compiled into a wire schema plus an
//! executable binding, and the registry that routes by platform id.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Declarative command compiler with typed arguments and autocomplete
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 2.0.0: Remove bang commands, slash-only command system
//! - 1.0.0: Initial reorganization with modular command structure

pub mod args;
pub mod compile;
pub mod declare;
pub mod handler;
pub mod handlers;
pub mod invocation;
pub mod registry;

pub use args::{ArgValue, Args, FromArgs};
pub use compile::CompiledCommand;
pub use declare::{Choice, CommandDecl, GroupDecl, OptionDecl, SubcommandDecl};
pub use handler::{AutocompleteHandler, AutocompleteRequest, CommandHandler};
pub use handlers::create_bundled;
pub use invocation::Invocation;
pub use registry::{register_commands, CommandRegistry, CommandSet};
