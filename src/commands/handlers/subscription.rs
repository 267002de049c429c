//! Subscription command handlers
//!
//! Handles: /subscription link, /subscription status, the Unlink button and
//! its confirmation modal
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serenity::model::application::component::ButtonStyle;
use std::sync::Arc;

use crate::commands::args::{Args, FromArgs};
use crate::commands::declare::{CommandDecl, OptionDecl, SubcommandDecl};
use crate::commands::handler::CommandHandler;
use crate::commands::invocation::Invocation;
use crate::core::error::{DeclarationError, DispatchError};
use crate::features::subscriptions::{SubscriberId, SubscriptionService};
use crate::interactions::components::{
    ButtonHandler, ComponentCall, ComponentRegistries, ModalCall, ModalHandler, RegistrationToken,
};
use crate::interactions::respond::{ButtonSpec, ModalForm, Reply, TextField};

const CONFIRM_FIELD: &str = "confirm";
const CONFIRM_WORD: &str = "UNLINK";

/// Arguments of `/subscription link`
pub struct LinkArgs {
    pub email: String,
}

impl FromArgs for LinkArgs {
    fn from_args(args: Args) -> Result<Self, DispatchError> {
        Ok(Self {
            email: args.string(0)?,
        })
    }
}

/// Subscribers are keyed by the billing email, compared case-insensitively
fn subscriber_key(email: &str) -> SubscriberId {
    SubscriberId(email.trim().to_lowercase())
}

pub struct LinkHandler {
    service: SubscriptionService,
}

#[async_trait]
impl CommandHandler<LinkArgs> for LinkHandler {
    async fn handle(&self, invocation: Invocation, args: LinkArgs) -> Result<()> {
        let key = subscriber_key(&args.email);
        let user_id = invocation.user_id();

        match self.service.link(&key, user_id).await? {
            Some(subscriber) => {
                info!("User {} linked subscription {}", user_id, subscriber.id);
                invocation
                    .reply_ephemeral(format!(
                        "Linked your account to the subscription for `{}`.",
                        subscriber.id
                    ))
                    .await
            }
            None => {
                invocation
                    .reply_ephemeral(format!(
                        "No subscription was found for `{}`. Use the email you paid with.",
                        key
                    ))
                    .await
            }
        }
    }
}

pub struct StatusHandler {
    service: SubscriptionService,
    unlink: RegistrationToken,
}

#[async_trait]
impl CommandHandler<()> for StatusHandler {
    async fn handle(&self, invocation: Invocation, _args: ()) -> Result<()> {
        let Some(status) = self.service.status_for(invocation.user_id()).await? else {
            return invocation
                .reply_ephemeral(
                    "No subscription is linked to your account. Use `/subscription link` first.",
                )
                .await;
        };

        let tier = status.subscriber.tier.as_deref().unwrap_or("standard");
        let expires = status.expires_at.timestamp();
        let reminder = if status.reminder_pending {
            "An expiry reminder is scheduled."
        } else {
            "No expiry reminder is scheduled."
        };
        let content = format!(
            "**Subscription:** `{}`\n**Tier:** {}\n**Expires:** <t:{expires}:F> (<t:{expires}:R>)\n{}",
            status.subscriber.id, tier, reminder
        );

        let unlink_id = self.unlink.encode(&[status.subscriber.id.as_str()])?;
        invocation
            .responder
            .reply(Reply::ephemeral(content).button(ButtonSpec::new(
                unlink_id,
                "Unlink",
                ButtonStyle::Danger,
            )))
            .await
    }
}

/// Opens the confirmation modal for the subscription named in the button
pub struct UnlinkButton {
    confirm: RegistrationToken,
}

#[async_trait]
impl ButtonHandler for UnlinkButton {
    async fn handle(&self, call: ComponentCall, args: Vec<String>) -> Result<()> {
        let subscriber = args.first().map(String::as_str).unwrap_or_default();
        let modal = ModalForm {
            custom_id: self.confirm.encode(&[subscriber])?,
            title: "Unlink subscription".to_string(),
            fields: vec![TextField::short(
                CONFIRM_FIELD,
                format!("Type {CONFIRM_WORD} to confirm"),
            )
            .placeholder(CONFIRM_WORD)
            .max_length(CONFIRM_WORD.len() as u64)],
        };
        call.responder.show_modal(modal).await
    }
}

pub struct UnlinkConfirm {
    service: SubscriptionService,
}

#[async_trait]
impl ModalHandler for UnlinkConfirm {
    async fn handle(&self, call: ModalCall, args: Vec<String>) -> Result<()> {
        let typed = call
            .interaction
            .fields
            .get(CONFIRM_FIELD)
            .unwrap_or_default()
            .trim();
        if !typed.eq_ignore_ascii_case(CONFIRM_WORD) {
            return call
                .responder
                .reply(Reply::ephemeral("Unlink cancelled."))
                .await;
        }

        // The modal names the subscription shown on the status message
        let Some(subscriber_id) = args.first().map(|id| SubscriberId::from(id.as_str())) else {
            return call
                .responder
                .reply(Reply::ephemeral("Your account was not linked to a subscription."))
                .await;
        };

        let user_id = call.interaction.invoker.user_id;
        let content = match self.service.unlink_from(user_id, &subscriber_id).await? {
            Some(subscriber) => format!("Unlinked your account from `{}`.", subscriber.id),
            None => format!(
                "`{}` is no longer linked to your account; nothing was unlinked.",
                subscriber_id
            ),
        };
        call.responder.reply(Reply::ephemeral(content)).await
    }
}

/// Register the Unlink components and declare `/subscription`
pub fn declare(
    service: &SubscriptionService,
    components: &mut ComponentRegistries,
) -> Result<CommandDecl, DeclarationError> {
    let confirm = components.register_modal(
        "unlink-confirm",
        Arc::new(UnlinkConfirm {
            service: service.clone(),
        }),
    )?;
    let unlink = components.register_button("unlink", Arc::new(UnlinkButton { confirm }))?;

    Ok(CommandDecl::slash("subscription", "Manage your subscription")
        .dm_permission(true)
        .subcommand(
            SubcommandDecl::new("link", "Link your Discord account to a subscription")
                .option(
                    OptionDecl::string("email", "The email you paid with")
                        .required(true)
                        .min_length(3)
                        .max_length(254),
                )
                .handler(LinkHandler {
                    service: service.clone(),
                }),
        )
        .subcommand(
            SubcommandDecl::new("status", "Show when your subscription expires").handler(
                StatusHandler {
                    service: service.clone(),
                    unlink,
                },
            ),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::scheduler::{ExpiryPolicy, ExpiryScheduler};
    use crate::features::subscriptions::{MemoryStore, Subscriber, SubscriberStore};
    use crate::interactions::event::{ComponentKind, ModalFields, OptionData, OptionKind};
    use crate::testing::{
        command_event, component_event, modal_event, RecordingPlatform, RecordingResponder,
        Response,
    };
    use crate::interactions::event::CommandKind;
    use chrono::Utc;
    use serde_json::json;
    use serenity::model::id::{ChannelId, UserId};

    fn service(store: Arc<MemoryStore>) -> SubscriptionService {
        let scheduler = ExpiryScheduler::new(
            store.clone(),
            Arc::new(RecordingPlatform::new()),
            ExpiryPolicy {
                channel_id: ChannelId(99),
                period: chrono::Duration::days(30),
                grace: chrono::Duration::days(3),
                notify_overdue_on_startup: false,
            },
        );
        SubscriptionService::new(store, scheduler)
    }

    fn link_event(email: &str) -> crate::interactions::event::CommandInteraction {
        command_event(
            1,
            "subscription",
            CommandKind::ChatInput,
            vec![OptionData::subcommand(
                "link",
                vec![OptionData::value("email", OptionKind::String, json!(email))],
            )],
        )
    }

    fn status_event() -> crate::interactions::event::CommandInteraction {
        command_event(
            1,
            "subscription",
            CommandKind::ChatInput,
            vec![OptionData::subcommand("status", vec![])],
        )
    }

    #[test]
    fn test_subscriber_key_normalizes_email() {
        assert_eq!(subscriber_key("  Ada@Example.COM "), SubscriberId::from("ada@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_then_status_then_unlink() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_subscriber(&Subscriber::new("ada@example.com", Utc::now()))
            .await
            .unwrap();
        let service = service(store.clone());
        let mut components = ComponentRegistries::new();
        let command = declare(&service, &mut components).unwrap().compile().unwrap();

        let responder = Arc::new(RecordingResponder::new());
        command
            .dispatch(Invocation::new(link_event("Ada@example.com"), responder.clone()))
            .await
            .unwrap();
        assert_eq!(
            responder.responses(),
            vec![Response::Reply(Reply::ephemeral(
                "Linked your account to the subscription for `ada@example.com`."
            ))]
        );
        assert!(service.scheduler().contains(&"ada@example.com".into()));

        let responder = Arc::new(RecordingResponder::new());
        command
            .dispatch(Invocation::new(status_event(), responder.clone()))
            .await
            .unwrap();
        let Response::Reply(reply) = &responder.responses()[0] else {
            panic!("expected a reply");
        };
        assert!(reply.ephemeral);
        assert!(reply.content.contains("`ada@example.com`"));
        assert_eq!(reply.buttons.len(), 1);
        assert_eq!(reply.buttons[0].custom_id, "button:unlink:ada@example.com");

        let button = components.button("unlink").unwrap();
        let responder = Arc::new(RecordingResponder::new());
        button
            .handle(
                ComponentCall {
                    interaction: component_event(&reply.buttons[0].custom_id, ComponentKind::Button),
                    responder: responder.clone(),
                },
                vec!["ada@example.com".to_string()],
            )
            .await
            .unwrap();
        let Response::Modal(modal) = &responder.responses()[0] else {
            panic!("expected a modal");
        };
        assert_eq!(modal.custom_id, "modal:unlink-confirm:ada@example.com");

        let mut fields = ModalFields::default();
        fields.insert(CONFIRM_FIELD, "unlink");
        let confirm = components.modal("unlink-confirm").unwrap();
        let responder = Arc::new(RecordingResponder::new());
        confirm
            .handle(
                ModalCall {
                    interaction: modal_event(&modal.custom_id, fields),
                    responder: responder.clone(),
                },
                vec!["ada@example.com".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(
            responder.responses(),
            vec![Response::Reply(Reply::ephemeral(
                "Unlinked your account from `ada@example.com`."
            ))]
        );
        assert!(service.status_for(UserId(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_link_unknown_email() {
        let service = service(Arc::new(MemoryStore::new()));
        let mut components = ComponentRegistries::new();
        let command = declare(&service, &mut components).unwrap().compile().unwrap();

        let responder = Arc::new(RecordingResponder::new());
        command
            .dispatch(Invocation::new(link_event("nobody@example.com"), responder.clone()))
            .await
            .unwrap();
        let Response::Reply(reply) = &responder.responses()[0] else {
            panic!("expected a reply");
        };
        assert!(reply.content.starts_with("No subscription was found"));
    }

    #[tokio::test]
    async fn test_wrong_confirmation_word_keeps_link() {
        let store = Arc::new(MemoryStore::new());
        let mut subscriber = Subscriber::new("ada@example.com", Utc::now());
        subscriber.discord_user_id = Some(UserId(7));
        store.upsert_subscriber(&subscriber).await.unwrap();
        let service = service(store);
        let mut components = ComponentRegistries::new();
        declare(&service, &mut components).unwrap();

        let mut fields = ModalFields::default();
        fields.insert(CONFIRM_FIELD, "nope");
        let responder = Arc::new(RecordingResponder::new());
        components
            .modal("unlink-confirm")
            .unwrap()
            .handle(
                ModalCall {
                    interaction: modal_event("modal:unlink-confirm:ada@example.com", fields),
                    responder: responder.clone(),
                },
                vec![],
            )
            .await
            .unwrap();

        assert_eq!(
            responder.responses(),
            vec![Response::Reply(Reply::ephemeral("Unlink cancelled."))]
        );
        assert!(service.status_for(UserId(7)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_confirm_for_previous_link_keeps_current_link() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.upsert_subscriber(&Subscriber::new("old@example.com", now)).await.unwrap();
        let mut current = Subscriber::new("new@example.com", now);
        current.discord_user_id = Some(UserId(7));
        store.upsert_subscriber(&current).await.unwrap();
        let service = service(store);
        let mut components = ComponentRegistries::new();
        declare(&service, &mut components).unwrap();

        // Modal opened from a status message shown before the user relinked
        let mut fields = ModalFields::default();
        fields.insert(CONFIRM_FIELD, "UNLINK");
        let responder = Arc::new(RecordingResponder::new());
        components
            .modal("unlink-confirm")
            .unwrap()
            .handle(
                ModalCall {
                    interaction: modal_event("modal:unlink-confirm:old@example.com", fields),
                    responder: responder.clone(),
                },
                vec!["old@example.com".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(
            responder.responses(),
            vec![Response::Reply(Reply::ephemeral(
                "`old@example.com` is no longer linked to your account; nothing was unlinked."
            ))]
        );
        let status = service.status_for(UserId(7)).await.unwrap().unwrap();
        assert_eq!(status.subscriber.id, SubscriberId::from("new@example.com"));
    }
}
