//! # Dispatch Engine
//!
//! Routes every inbound interaction to exactly one terminal outcome: handled,
//! rejected for authorization, or reported as a fault.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use log::{debug, error, info, warn};
use serenity::model::id::{ChannelId, UserId};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::compile::CompiledCommand;
use crate::commands::invocation::Invocation;
use crate::commands::registry::CommandRegistry;
use crate::core::error::{DispatchError, IdentityError};
use crate::core::response::code_block;
use crate::interactions::components::{Collected, ComponentCall, ComponentRegistries, ModalCall};
use crate::interactions::event::{
    CommandInteraction, ComponentInteraction, ComponentKind, InteractionEvent, ModalInteraction,
};
use crate::interactions::identity::{decode, Identity, Scope};
use crate::interactions::respond::{Reply, Responder};
use crate::platform::Platform;

const GENERIC_FAILURE: &str = "Something went wrong while handling that. The team has been notified.";
const PERMISSION_DENIED: &str = "You don't have permission to use this.";

/// How a single interaction ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran to completion
    Handled,
    /// The invoker lacked permissions; they were told so
    Rejected,
    /// Something failed; it was logged and the user got a generic reply
    Reported,
}

/// Routes interaction events to command and component handlers
pub struct Dispatcher {
    commands: CommandRegistry,
    components: Arc<ComponentRegistries>,
    operator: Option<(Arc<dyn Platform>, ChannelId)>,
}

impl Dispatcher {
    pub fn new(commands: CommandRegistry, components: Arc<ComponentRegistries>) -> Self {
        Self {
            commands,
            components,
            operator: None,
        }
    }

    /// Post fault details to `channel_id` in addition to the log
    pub fn with_operator_channel(mut self, platform: Arc<dyn Platform>, channel_id: ChannelId) -> Self {
        self.operator = Some((platform, channel_id));
        self
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn components(&self) -> &Arc<ComponentRegistries> {
        &self.components
    }

    /// Handle one event; never fails, every error ends in a reply
    pub async fn dispatch(
        &self,
        event: InteractionEvent,
        responder: Arc<dyn Responder>,
    ) -> DispatchOutcome {
        let request_id = Uuid::new_v4();
        let label = event.label();
        let user_id = event.invoker().user_id;
        let is_autocomplete = matches!(event, InteractionEvent::Autocomplete(_));
        debug!("[{request_id}] 📥 {label} from user {user_id}");

        match self.route(event, Arc::clone(&responder)).await {
            Ok(()) => {
                debug!("[{request_id}] ✅ {label} handled");
                DispatchOutcome::Handled
            }
            Err(err) if err.is_authorization() => {
                info!("[{request_id}] 🚫 {label} rejected for user {user_id}: {err}");
                let answered = if is_autocomplete {
                    responder.autocomplete(Vec::new()).await
                } else {
                    answer(responder.as_ref(), PERMISSION_DENIED).await
                };
                if let Err(e) = answered {
                    warn!("[{request_id}] Failed to send permission message: {e:#}");
                }
                DispatchOutcome::Rejected
            }
            Err(err) => {
                self.report(request_id, &label, user_id, &err, responder.as_ref(), is_autocomplete)
                    .await;
                DispatchOutcome::Reported
            }
        }
    }

    async fn route(
        &self,
        event: InteractionEvent,
        responder: Arc<dyn Responder>,
    ) -> Result<(), DispatchError> {
        match event {
            InteractionEvent::Command(interaction) => {
                let command = self.lookup(&interaction)?;
                command.check_permissions(&interaction.invoker)?;
                let invocation = Invocation::new(interaction, responder);
                contain(async move { command.dispatch(invocation).await }).await
            }
            InteractionEvent::Autocomplete(interaction) => {
                let command = self.lookup(&interaction)?;
                command.check_permissions(&interaction.invoker)?;
                let invocation = Invocation::new(interaction, Arc::clone(&responder));
                let choices = contain(async move { command.autocomplete(invocation).await }).await?;
                responder.autocomplete(choices).await?;
                Ok(())
            }
            InteractionEvent::Component(interaction) => {
                self.route_component(interaction, responder).await
            }
            InteractionEvent::Modal(interaction) => self.route_modal(interaction, responder).await,
        }
    }

    /// Find the command by platform id and confirm it still has the declared kind
    fn lookup(
        &self,
        interaction: &CommandInteraction,
    ) -> Result<Arc<CompiledCommand>, DispatchError> {
        let command = self
            .commands
            .get(interaction.command_id)
            .ok_or(DispatchError::CommandNotFound(interaction.command_id.0))?;

        if command.kind() != interaction.kind {
            return Err(DispatchError::CommandTypeMismatch {
                name: command.name().to_string(),
                declared: command.kind(),
                received: interaction.kind,
            });
        }
        Ok(command)
    }

    async fn route_component(
        &self,
        interaction: ComponentInteraction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), DispatchError> {
        let Identity { scope, name, args } = decode(&interaction.custom_id)?;

        match (scope, interaction.kind) {
            (Scope::Button, ComponentKind::Button) => {
                let handler = self
                    .components
                    .button(&name)
                    .ok_or_else(|| not_found(scope, &name))?;
                let call = ComponentCall {
                    interaction,
                    responder,
                };
                contain(async move {
                    handler.handle(call, args).await.map_err(DispatchError::Handler)
                })
                .await
            }
            (Scope::UserSelect, ComponentKind::SelectMenu) => {
                let handler = self
                    .components
                    .user_select(&name)
                    .ok_or_else(|| not_found(scope, &name))?;
                let users = selected_users(&interaction.values)?;
                let call = ComponentCall {
                    interaction,
                    responder,
                };
                contain(async move {
                    handler.handle(call, users, args).await.map_err(DispatchError::Handler)
                })
                .await
            }
            (Scope::Collector, _) => self.components.collectors().deliver(
                &name,
                Collected {
                    interaction,
                    args,
                    responder,
                },
            ),
            _ => Err(IdentityError::Invalid {
                raw: interaction.custom_id,
                reason: "scope does not match the component type",
            }
            .into()),
        }
    }

    async fn route_modal(
        &self,
        interaction: ModalInteraction,
        responder: Arc<dyn Responder>,
    ) -> Result<(), DispatchError> {
        let Identity { scope, name, args } = decode(&interaction.custom_id)?;
        if scope != Scope::Modal {
            return Err(IdentityError::Invalid {
                raw: interaction.custom_id,
                reason: "scope does not match a modal submission",
            }
            .into());
        }

        let handler = self
            .components
            .modal(&name)
            .ok_or_else(|| not_found(scope, &name))?;
        let call = ModalCall {
            interaction,
            responder,
        };
        contain(async move { handler.handle(call, args).await.map_err(DispatchError::Handler) })
            .await
    }

    /// Log a fault, tell the operators, and give the user a generic answer
    async fn report(
        &self,
        request_id: Uuid,
        label: &str,
        user_id: UserId,
        err: &DispatchError,
        responder: &dyn Responder,
        is_autocomplete: bool,
    ) {
        error!("[{request_id}] ❌ {label} from user {user_id} failed: {err}");
        debug!("[{request_id}] Failure detail: {err:?}");

        if let Some((platform, channel_id)) = &self.operator {
            let header = format!("[{request_id}] {label} from <@{user_id}> failed");
            let body = format!("{err}\n\n{err:?}");
            if let Err(e) = platform.send_message(*channel_id, &code_block(&header, &body)).await {
                warn!("[{request_id}] Failed to report to operator channel: {e:#}");
            }
        }

        let answered = if is_autocomplete {
            responder.autocomplete(Vec::new()).await
        } else {
            answer(responder, GENERIC_FAILURE).await
        };
        if let Err(e) = answered {
            warn!("[{request_id}] Failed to send error reply: {e:#}");
        }
    }
}

/// Reply ephemerally, or edit the existing response when there is one
async fn answer(responder: &dyn Responder, content: &str) -> anyhow::Result<()> {
    if responder.has_responded() {
        responder.edit(content).await
    } else {
        responder.reply(Reply::ephemeral(content)).await
    }
}

/// Run a handler on its own task so a panic becomes an error
async fn contain<T, F>(future: F) -> Result<T, DispatchError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, DispatchError>> + Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(result) => result,
        Err(join) if join.is_panic() => Err(DispatchError::HandlerPanicked(panic_message(
            join.into_panic(),
        ))),
        Err(join) => Err(DispatchError::HandlerPanicked(join.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn not_found(scope: Scope, name: &str) -> DispatchError {
    DispatchError::HandlerNotFound {
        scope,
        name: name.to_string(),
    }
}

fn selected_users(values: &[String]) -> Result<Vec<UserId>, DispatchError> {
    values
        .iter()
        .map(|raw| {
            raw.parse::<u64>()
                .map(UserId)
                .map_err(|_| DispatchError::InvalidOptionValue {
                    option: "values".to_string(),
                    reason: format!("'{raw}' is not a user id"),
                })
        })
        .collect()
}
