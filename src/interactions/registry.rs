//! Name-keyed handler registry
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Reject duplicate names instead of silently replacing handlers
//! - 1.0.0: Initial implementation for handler dispatch

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::DeclarationError;
use crate::interactions::identity::validate_name;

/// Registry mapping registration names to handlers
///
/// Registries are filled at startup and only read afterwards. A name can be
/// registered once; a second registration is a declaration error.
///
/// # Example
///
/// ```ignore
/// let mut buttons: HandlerRegistry<dyn ButtonHandler> = HandlerRegistry::new("button");
/// buttons.register("unlink", Arc::new(UnlinkButton))?;
///
/// if let Some(handler) = buttons.get("unlink") {
///     handler.handle(call, args).await?;
/// }
/// ```
pub struct HandlerRegistry<H: ?Sized> {
    kind: &'static str,
    handlers: HashMap<String, Arc<H>>,
}

impl<H: ?Sized> HandlerRegistry<H> {
    /// Create a new empty registry; `kind` names it in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a unique name
    pub fn register(&mut self, name: &str, handler: Arc<H>) -> Result<(), DeclarationError> {
        validate_name(name).map_err(|reason| DeclarationError::InvalidName {
            name: name.to_string(),
            reason,
        })?;

        if self.handlers.contains_key(name) {
            return Err(DeclarationError::DuplicateName {
                registry: self.kind,
                name: name.to_string(),
            });
        }
        self.handlers.insert(name.to_string(), handler);
        Ok(())
    }

    /// Get handler for a name
    pub fn get(&self, name: &str) -> Option<Arc<H>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
