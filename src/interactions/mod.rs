//! # Interactions
//!
//! Event model, identity codec, component registries and the dispatcher that
//! ties them to compiled commands.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod components;
pub mod dispatch;
pub mod event;
pub mod identity;
pub mod registry;
pub mod respond;

pub use components::{
    ButtonHandler, Collected, Collector, CollectorHub, ComponentCall, ComponentRegistries,
    ModalCall, ModalHandler, RegistrationToken, UserSelectHandler,
};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use event::{
    CommandInteraction, CommandKind, ComponentInteraction, ComponentKind, InteractionEvent,
    Invoker, ModalFields, ModalInteraction, OptionData, OptionKind,
};
pub use identity::{decode, Identity, Scope, CUSTOM_ID_LIMIT};
pub use registry::HandlerRegistry;
pub use respond::{
    AutocompleteChoice, ButtonSpec, ModalForm, Reply, Responder, TextField, UserSelectSpec,
    AUTOCOMPLETE_CHOICE_LIMIT,
};
