//! # Component Handlers
//!
//! Buttons, user select menus, modals and one-shot collectors, each routed by
//! an identity string.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serenity::model::id::UserId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::core::error::{DeclarationError, DispatchError, IdentityError};
use crate::interactions::event::{ComponentInteraction, ModalInteraction};
use crate::interactions::identity::{format_identity, validate_name, Scope};
use crate::interactions::registry::HandlerRegistry;
use crate::interactions::respond::Responder;

/// A component activation together with the means to answer it
#[derive(Clone)]
pub struct ComponentCall {
    pub interaction: ComponentInteraction,
    pub responder: Arc<dyn Responder>,
}

/// A modal submission together with the means to answer it
#[derive(Clone)]
pub struct ModalCall {
    pub interaction: ModalInteraction,
    pub responder: Arc<dyn Responder>,
}

#[async_trait]
pub trait ButtonHandler: Send + Sync {
    /// Handle a button press; `args` are the decoded identity arguments
    async fn handle(&self, call: ComponentCall, args: Vec<String>) -> Result<()>;
}

#[async_trait]
pub trait UserSelectHandler: Send + Sync {
    async fn handle(&self, call: ComponentCall, users: Vec<UserId>, args: Vec<String>)
        -> Result<()>;
}

#[async_trait]
pub trait ModalHandler: Send + Sync {
    async fn handle(&self, call: ModalCall, args: Vec<String>) -> Result<()>;
}

/// Proof that a name is registered under a scope
///
/// Returned by registration; encoding through a token cannot produce a dead
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationToken {
    scope: Scope,
    name: String,
}

impl RegistrationToken {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode an identity string routed to this registration
    pub fn encode<S: AsRef<str>>(&self, args: &[S]) -> Result<String, IdentityError> {
        format_identity(self.scope, &self.name, args)
    }
}

/// A component interaction delivered to a waiting collector
#[derive(Clone)]
pub struct Collected {
    pub interaction: ComponentInteraction,
    pub args: Vec<String>,
    pub responder: Arc<dyn Responder>,
}

/// Table of collectors currently waiting for a component activation
#[derive(Clone, Default)]
pub struct CollectorHub {
    waiting: Arc<DashMap<String, oneshot::Sender<Collected>>>,
}

impl CollectorHub {
    /// Start waiting for one activation of a `collector:<name>` identity
    pub fn open(&self, name: impl Into<String>) -> Result<Collector, DeclarationError> {
        let name = name.into();
        validate_name(&name).map_err(|reason| DeclarationError::InvalidName {
            name: name.clone(),
            reason,
        })?;

        let (sender, receiver) = oneshot::channel();
        match self.waiting.entry(name.clone()) {
            Entry::Occupied(_) => Err(DeclarationError::DuplicateName {
                registry: "collector",
                name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(sender);
                Ok(Collector {
                    name,
                    receiver,
                    waiting: Arc::clone(&self.waiting),
                })
            }
        }
    }

    pub fn is_waiting(&self, name: &str) -> bool {
        self.waiting.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub(crate) fn deliver(&self, name: &str, collected: Collected) -> Result<(), DispatchError> {
        let not_found = || DispatchError::HandlerNotFound {
            scope: Scope::Collector,
            name: name.to_string(),
        };
        let (_, sender) = self.waiting.remove(name).ok_or_else(not_found)?;
        sender.send(collected).map_err(|_| not_found())
    }
}

/// A pending one-shot wait; stops waiting when dropped
pub struct Collector {
    name: String,
    receiver: oneshot::Receiver<Collected>,
    waiting: Arc<DashMap<String, oneshot::Sender<Collected>>>,
}

impl Collector {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity string for a component that should resolve this collector
    pub fn identity<S: AsRef<str>>(&self, args: &[S]) -> Result<String, IdentityError> {
        format_identity(Scope::Collector, &self.name, args)
    }

    /// Wait for the activation, or `None` once `timeout` elapses
    pub async fn wait(mut self, timeout: Duration) -> Option<Collected> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(collected)) => Some(collected),
            _ => None,
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        // Closing first marks our own sender, so a newer collector reusing the
        // name is left alone.
        self.receiver.close();
        self.waiting.remove_if(&self.name, |_, sender| sender.is_closed());
    }
}

/// The per-scope lookup tables used by the dispatcher
pub struct ComponentRegistries {
    buttons: HandlerRegistry<dyn ButtonHandler>,
    user_selects: HandlerRegistry<dyn UserSelectHandler>,
    modals: HandlerRegistry<dyn ModalHandler>,
    collectors: CollectorHub,
}

impl ComponentRegistries {
    pub fn new() -> Self {
        Self {
            buttons: HandlerRegistry::new("button"),
            user_selects: HandlerRegistry::new("user select"),
            modals: HandlerRegistry::new("modal"),
            collectors: CollectorHub::default(),
        }
    }

    pub fn register_button(
        &mut self,
        name: &str,
        handler: Arc<dyn ButtonHandler>,
    ) -> Result<RegistrationToken, DeclarationError> {
        self.buttons.register(name, handler)?;
        Ok(token(Scope::Button, name))
    }

    pub fn register_user_select(
        &mut self,
        name: &str,
        handler: Arc<dyn UserSelectHandler>,
    ) -> Result<RegistrationToken, DeclarationError> {
        self.user_selects.register(name, handler)?;
        Ok(token(Scope::UserSelect, name))
    }

    pub fn register_modal(
        &mut self,
        name: &str,
        handler: Arc<dyn ModalHandler>,
    ) -> Result<RegistrationToken, DeclarationError> {
        self.modals.register(name, handler)?;
        Ok(token(Scope::Modal, name))
    }

    pub fn button(&self, name: &str) -> Option<Arc<dyn ButtonHandler>> {
        self.buttons.get(name)
    }

    pub fn user_select(&self, name: &str) -> Option<Arc<dyn UserSelectHandler>> {
        self.user_selects.get(name)
    }

    pub fn modal(&self, name: &str) -> Option<Arc<dyn ModalHandler>> {
        self.modals.get(name)
    }

    pub fn collectors(&self) -> &CollectorHub {
        &self.collectors
    }

    /// Whether `name` currently resolves under `scope`
    pub fn contains(&self, scope: Scope, name: &str) -> bool {
        match scope {
            Scope::Button => self.buttons.contains(name),
            Scope::UserSelect => self.user_selects.contains(name),
            Scope::Modal => self.modals.contains(name),
            Scope::Collector => self.collectors.is_waiting(name),
        }
    }

    /// Encode an identity, failing fast if nothing would handle it
    pub fn encode<S: AsRef<str>>(
        &self,
        scope: Scope,
        name: &str,
        args: &[S],
    ) -> Result<String, IdentityError> {
        if !self.contains(scope, name) {
            return Err(IdentityError::Unregistered {
                scope,
                name: name.to_string(),
            });
        }
        format_identity(scope, name, args)
    }
}

impl Default for ComponentRegistries {
    fn default() -> Self {
        Self::new()
    }
}

fn token(scope: Scope, name: &str) -> RegistrationToken {
    RegistrationToken {
        scope,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::identity::decode;
    use crate::testing::{component_event, RecordingResponder};
    use crate::interactions::event::ComponentKind;

    struct NoopButton;

    #[async_trait]
    impl ButtonHandler for NoopButton {
        async fn handle(&self, _call: ComponentCall, _args: Vec<String>) -> Result<()> {
            Ok(())
        }
    }

    struct NoopModal;

    #[async_trait]
    impl ModalHandler for NoopModal {
        async fn handle(&self, _call: ModalCall, _args: Vec<String>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encode_requires_registration() {
        let registries = ComponentRegistries::new();
        let err = registries
            .encode(Scope::Button, "unlink", &["1"])
            .unwrap_err();
        assert_eq!(
            err,
            IdentityError::Unregistered {
                scope: Scope::Button,
                name: "unlink".to_string(),
            }
        );
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut registries = ComponentRegistries::new();
        registries.register_button("unlink", Arc::new(NoopButton)).unwrap();

        let args = ["sub:1", "extra"];
        let encoded = registries.encode(Scope::Button, "unlink", &args).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.scope, Scope::Button);
        assert_eq!(decoded.name, "unlink");
        assert_eq!(decoded.args, args);
    }

    #[test]
    fn test_same_name_in_different_registries() {
        let mut registries = ComponentRegistries::new();
        registries.register_button("confirm", Arc::new(NoopButton)).unwrap();
        registries.register_modal("confirm", Arc::new(NoopModal)).unwrap();

        assert!(registries.contains(Scope::Button, "confirm"));
        assert!(registries.contains(Scope::Modal, "confirm"));
        assert!(!registries.contains(Scope::UserSelect, "confirm"));
    }

    #[test]
    fn test_duplicate_in_same_registry_fails() {
        let mut registries = ComponentRegistries::new();
        registries.register_modal("confirm", Arc::new(NoopModal)).unwrap();
        let err = registries
            .register_modal("confirm", Arc::new(NoopModal))
            .unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateName { registry: "modal", .. }));
    }

    #[test]
    fn test_token_encodes_its_scope() {
        let mut registries = ComponentRegistries::new();
        let token = registries.register_modal("confirm", Arc::new(NoopModal)).unwrap();
        assert_eq!(token.scope(), Scope::Modal);
        assert_eq!(token.encode(&["7"]).unwrap(), "modal:confirm:7");
    }

    #[tokio::test]
    async fn test_collector_receives_delivery() {
        let hub = CollectorHub::default();
        let collector = hub.open("refresh-1").unwrap();
        assert!(hub.is_waiting("refresh-1"));
        assert_eq!(collector.identity(&["x"]).unwrap(), "collector:refresh-1:x");

        let responder = Arc::new(RecordingResponder::new());
        hub.deliver(
            "refresh-1",
            Collected {
                interaction: component_event("collector:refresh-1:x", ComponentKind::Button),
                args: vec!["x".to_string()],
                responder,
            },
        )
        .unwrap();

        let collected = collector.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(collected.args, vec!["x"]);
        assert!(hub.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_times_out_and_unregisters() {
        let hub = CollectorHub::default();
        let collector = hub.open("refresh-2").unwrap();

        assert!(collector.wait(Duration::from_secs(60)).await.is_none());
        assert!(!hub.is_waiting("refresh-2"));
    }

    #[test]
    fn test_collector_names_unique_while_waiting() {
        let hub = CollectorHub::default();
        let first = hub.open("same").unwrap();
        assert!(hub.open("same").is_err());
        drop(first);
        assert!(hub.open("same").is_ok());
    }

    #[test]
    fn test_deliver_without_collector_fails() {
        let hub = CollectorHub::default();
        let responder = Arc::new(RecordingResponder::new());
        let result = hub.deliver(
            "nobody",
            Collected {
                interaction: component_event("collector:nobody", ComponentKind::Button),
                args: vec![],
                responder,
            },
        );
        assert!(matches!(result, Err(DispatchError::HandlerNotFound { .. })));
    }
}
