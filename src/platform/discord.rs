//! Serenity-backed platform and responder
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Converts gateway interactions into `InteractionEvent`s and answers them
//! through the serenity HTTP client.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use serenity::builder::{CreateApplicationCommand, CreateInteractionResponse};
use serenity::http::Http;
use serenity::model::application::command::Command;
use serenity::model::application::component::{ActionRowComponent, ComponentType, InputTextStyle};
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandData, CommandDataOption,
};
use serenity::model::application::interaction::autocomplete::AutocompleteInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::modal::ModalSubmitInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, CommandId, GuildId};
use serenity::model::user::User;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Platform;
use crate::core::response::truncate_for_message;
use crate::interactions::event::{
    CommandInteraction, CommandKind, ComponentInteraction, ComponentKind, InteractionEvent,
    Invoker, ModalFields, ModalInteraction, OptionData, OptionKind,
};
use crate::interactions::respond::{
    AutocompleteChoice, ModalForm, Reply, Responder, UserSelectSpec,
};

/// Platform calls over the serenity HTTP client
pub struct SerenityPlatform {
    http: Arc<Http>,
    guild_id: Option<GuildId>,
}

impl SerenityPlatform {
    /// Commands are registered to `guild_id` when given, globally otherwise
    pub fn new(http: Arc<Http>, guild_id: Option<GuildId>) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        channel_id
            .say(&self.http, truncate_for_message(content))
            .await?;
        Ok(())
    }

    async fn register_command_schemas(
        &self,
        schemas: Vec<CreateApplicationCommand>,
    ) -> Result<HashMap<String, CommandId>> {
        let registered = match self.guild_id {
            Some(guild_id) => {
                guild_id
                    .set_application_commands(&self.http, |commands| {
                        for schema in schemas {
                            commands.add_application_command(schema);
                        }
                        commands
                    })
                    .await?
            }
            None => {
                Command::set_global_application_commands(&self.http, |commands| {
                    for schema in schemas {
                        commands.add_application_command(schema);
                    }
                    commands
                })
                .await?
            }
        };

        Ok(registered
            .into_iter()
            .map(|command| (command.name, command.id))
            .collect())
    }
}

/// The serenity interaction behind an event, kept for answering it
pub enum SerenityInteraction {
    Command(ApplicationCommandInteraction),
    Autocomplete(AutocompleteInteraction),
    Component(MessageComponentInteraction),
    Modal(ModalSubmitInteraction),
}

/// Split a gateway interaction into the event model and its reply handle
///
/// Pings and unknown command or option types yield `None`.
pub fn convert_interaction(
    interaction: Interaction,
) -> Option<(InteractionEvent, SerenityInteraction)> {
    match interaction {
        Interaction::ApplicationCommand(command) => {
            let event = command_event(
                &command.data,
                invoker(&command.user, command.member.as_ref(), command.guild_id),
                command.channel_id,
            )?;
            Some((
                InteractionEvent::Command(event),
                SerenityInteraction::Command(command),
            ))
        }
        Interaction::Autocomplete(autocomplete) => {
            let event = command_event(
                &autocomplete.data,
                invoker(
                    &autocomplete.user,
                    autocomplete.member.as_ref(),
                    autocomplete.guild_id,
                ),
                autocomplete.channel_id,
            )?;
            Some((
                InteractionEvent::Autocomplete(event),
                SerenityInteraction::Autocomplete(autocomplete),
            ))
        }
        Interaction::MessageComponent(component) => {
            let event = ComponentInteraction {
                custom_id: component.data.custom_id.clone(),
                kind: component_kind(component.data.component_type),
                values: component.data.values.clone(),
                invoker: invoker(&component.user, component.member.as_ref(), component.guild_id),
                channel_id: component.channel_id,
                message_id: Some(component.message.id),
            };
            Some((
                InteractionEvent::Component(event),
                SerenityInteraction::Component(component),
            ))
        }
        Interaction::ModalSubmit(modal) => {
            let fields = modal
                .data
                .components
                .iter()
                .flat_map(|row| row.components.iter())
                .filter_map(|component| match component {
                    ActionRowComponent::InputText(input) => {
                        Some((input.custom_id.clone(), input.value.clone()))
                    }
                    _ => None,
                })
                .collect::<ModalFields>();
            let event = ModalInteraction {
                custom_id: modal.data.custom_id.clone(),
                fields,
                invoker: invoker(&modal.user, modal.member.as_ref(), modal.guild_id),
                channel_id: modal.channel_id,
            };
            Some((InteractionEvent::Modal(event), SerenityInteraction::Modal(modal)))
        }
        _ => None,
    }
}

fn invoker(user: &User, member: Option<&Member>, guild_id: Option<GuildId>) -> Invoker {
    Invoker {
        user_id: user.id,
        guild_id,
        permissions: member.and_then(|member| member.permissions),
    }
}

fn command_event(
    data: &CommandData,
    invoker: Invoker,
    channel_id: ChannelId,
) -> Option<CommandInteraction> {
    Some(CommandInteraction {
        command_id: data.id,
        name: data.name.clone(),
        kind: CommandKind::from_serenity(data.kind)?,
        options: convert_options(&data.options),
        target_id: data.target_id.map(|target| target.0),
        invoker,
        channel_id,
    })
}

fn convert_options(options: &[CommandDataOption]) -> Vec<OptionData> {
    options
        .iter()
        .filter_map(|option| {
            Some(OptionData {
                name: option.name.clone(),
                kind: OptionKind::from_serenity(option.kind)?,
                value: option.value.clone(),
                options: convert_options(&option.options),
                focused: option.focused,
            })
        })
        .collect()
}

/// Wire type of a user select menu; serenity 0.11 only names string menus
const USER_SELECT_TYPE: u8 = 5;

/// Every select menu flavor (string, user, role, mentionable, channel) maps
/// to `SelectMenu`. This serenity version reads types 5 to 8 as `Unknown`,
/// and buttons and select menus are the only components that send
/// interactions, so anything unnamed is a select menu.
fn component_kind(kind: ComponentType) -> ComponentKind {
    match kind {
        ComponentType::Button => ComponentKind::Button,
        ComponentType::ActionRow | ComponentType::InputText => ComponentKind::Other,
        _ => ComponentKind::SelectMenu,
    }
}

/// Action row holding one user select menu, as raw component JSON
fn user_select_row(menu: &UserSelectSpec) -> Value {
    let mut select = json!({
        "type": USER_SELECT_TYPE,
        "custom_id": menu.custom_id,
        "min_values": menu.min_values,
        "max_values": menu.max_values,
    });
    if let Some(placeholder) = &menu.placeholder {
        select["placeholder"] = Value::from(placeholder.as_str());
    }
    json!({ "type": 1, "components": [select] })
}

fn choices_value(choices: &[AutocompleteChoice]) -> Value {
    Value::Array(
        choices
            .iter()
            .map(|choice| json!({ "name": choice.name, "value": choice.value }))
            .collect(),
    )
}

fn reply_response<'a, 'b>(
    response: &'a mut CreateInteractionResponse<'b>,
    reply: &Reply,
) -> &'a mut CreateInteractionResponse<'b> {
    response
        .kind(InteractionResponseType::ChannelMessageWithSource)
        .interaction_response_data(|message| {
            message
                .content(truncate_for_message(&reply.content))
                .ephemeral(reply.ephemeral);
            if !reply.buttons.is_empty() || reply.user_select.is_some() {
                message.components(|components| {
                    if !reply.buttons.is_empty() {
                        components.create_action_row(|row| {
                            for button in &reply.buttons {
                                row.create_button(|b| {
                                    b.custom_id(&button.custom_id)
                                        .label(&button.label)
                                        .style(button.style)
                                });
                            }
                            row
                        });
                    }
                    if let Some(menu) = &reply.user_select {
                        components.0.push(user_select_row(menu));
                    }
                    components
                });
            }
            message
        })
}

fn defer_response<'a, 'b>(
    response: &'a mut CreateInteractionResponse<'b>,
    ephemeral: bool,
) -> &'a mut CreateInteractionResponse<'b> {
    response
        .kind(InteractionResponseType::DeferredChannelMessageWithSource)
        .interaction_response_data(|message| message.ephemeral(ephemeral))
}

fn modal_response<'a, 'b>(
    response: &'a mut CreateInteractionResponse<'b>,
    modal: &ModalForm,
) -> &'a mut CreateInteractionResponse<'b> {
    response
        .kind(InteractionResponseType::Modal)
        .interaction_response_data(|data| {
            data.custom_id(&modal.custom_id)
                .title(&modal.title)
                .components(|components| {
                    for field in &modal.fields {
                        components.create_action_row(|row| {
                            row.create_input_text(|input| {
                                let style = if field.paragraph {
                                    InputTextStyle::Paragraph
                                } else {
                                    InputTextStyle::Short
                                };
                                input
                                    .custom_id(&field.custom_id)
                                    .label(&field.label)
                                    .style(style)
                                    .required(field.required);
                                if let Some(placeholder) = &field.placeholder {
                                    input.placeholder(placeholder);
                                }
                                if let Some(max) = field.max_length {
                                    input.max_length(max);
                                }
                                input
                            })
                        });
                    }
                    components
                })
        })
}

/// Answers one serenity interaction
pub struct SerenityResponder {
    http: Arc<Http>,
    interaction: SerenityInteraction,
    responded: AtomicBool,
}

impl SerenityResponder {
    pub fn new(http: Arc<Http>, interaction: SerenityInteraction) -> Self {
        Self {
            http,
            interaction,
            responded: AtomicBool::new(false),
        }
    }

    fn mark_responded(&self) {
        self.responded.store(true, Ordering::SeqCst);
    }
}

/// Run the same response call on whichever message-capable interaction we hold
macro_rules! on_message_interaction {
    ($interaction:expr, $i:ident => $call:expr) => {
        match $interaction {
            SerenityInteraction::Command($i) => $call,
            SerenityInteraction::Component($i) => $call,
            SerenityInteraction::Modal($i) => $call,
            SerenityInteraction::Autocomplete(_) => Err(anyhow!(
                "autocomplete interactions can only be answered with choices"
            )),
        }
    };
}

#[async_trait]
impl Responder for SerenityResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        on_message_interaction!(&self.interaction, i => i
            .create_interaction_response(&self.http, |r| reply_response(r, &reply))
            .await
            .map_err(anyhow::Error::from))?;
        self.mark_responded();
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<()> {
        on_message_interaction!(&self.interaction, i => i
            .create_interaction_response(&self.http, |r| defer_response(r, ephemeral))
            .await
            .map_err(anyhow::Error::from))?;
        self.mark_responded();
        Ok(())
    }

    async fn edit(&self, content: &str) -> Result<()> {
        let content = truncate_for_message(content);
        on_message_interaction!(&self.interaction, i => i
            .edit_original_interaction_response(&self.http, |r| r.content(&content))
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from))?;
        self.mark_responded();
        Ok(())
    }

    async fn show_modal(&self, modal: ModalForm) -> Result<()> {
        match &self.interaction {
            SerenityInteraction::Command(i) => {
                i.create_interaction_response(&self.http, |r| modal_response(r, &modal))
                    .await?
            }
            SerenityInteraction::Component(i) => {
                i.create_interaction_response(&self.http, |r| modal_response(r, &modal))
                    .await?
            }
            _ => return Err(anyhow!("a modal can only answer a command or component")),
        }
        self.mark_responded();
        Ok(())
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<()> {
        let SerenityInteraction::Autocomplete(i) = &self.interaction else {
            return Err(anyhow!("choices can only answer an autocomplete request"));
        };
        let choices = choices_value(&choices);
        i.create_autocomplete_response(&self.http, |response| {
            response.0.insert("choices", choices);
            response
        })
        .await?;
        self.mark_responded();
        Ok(())
    }

    fn has_responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }
}
