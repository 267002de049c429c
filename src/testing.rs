//! Test doubles shared by unit tests

use anyhow::Result;
use async_trait::async_trait;
use serenity::builder::CreateApplicationCommand;
use serenity::model::id::{ChannelId, CommandId, GuildId, MessageId, UserId};
use serenity::model::permissions::Permissions;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::interactions::event::{
    CommandInteraction, CommandKind, ComponentInteraction, ComponentKind, Invoker,
    ModalFields, ModalInteraction, OptionData,
};
use crate::interactions::respond::{AutocompleteChoice, ModalForm, Reply, Responder};
use crate::platform::Platform;

/// Everything a `RecordingResponder` was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Reply(Reply),
    Defer { ephemeral: bool },
    Edit(String),
    Modal(ModalForm),
    Autocomplete(Vec<AutocompleteChoice>),
}

#[derive(Default)]
pub struct RecordingResponder {
    responses: Mutex<Vec<Response>>,
    responded: AtomicBool,
    failing: AtomicBool,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A responder whose every call fails
    pub fn failing() -> Self {
        let responder = Self::default();
        responder.failing.store(true, Ordering::SeqCst);
        responder
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().unwrap().clone()
    }

    fn record(&self, response: Response) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("interaction token expired");
        }
        self.responses.lock().unwrap().push(response);
        self.responded.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        self.record(Response::Reply(reply))
    }

    async fn defer(&self, ephemeral: bool) -> Result<()> {
        self.record(Response::Defer { ephemeral })
    }

    async fn edit(&self, content: &str) -> Result<()> {
        self.record(Response::Edit(content.to_string()))
    }

    async fn show_modal(&self, modal: ModalForm) -> Result<()> {
        self.record(Response::Modal(modal))
    }

    async fn autocomplete(&self, choices: Vec<AutocompleteChoice>) -> Result<()> {
        self.record(Response::Autocomplete(choices))
    }

    fn has_responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }
}

/// Records sent messages and hands out sequential command ids
#[derive(Default)]
pub struct RecordingPlatform {
    messages: Mutex<Vec<(ChannelId, String)>>,
    failing: AtomicBool,
    rejecting_registrations: AtomicBool,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let platform = Self::default();
        platform.failing.store(true, Ordering::SeqCst);
        platform
    }

    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Make command registration fail until switched back
    pub fn reject_registrations(&self, reject: bool) {
        self.rejecting_registrations.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("missing access");
        }
        self.messages
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn register_command_schemas(
        &self,
        schemas: Vec<CreateApplicationCommand>,
    ) -> Result<HashMap<String, CommandId>> {
        if self.rejecting_registrations.load(Ordering::SeqCst) {
            anyhow::bail!("503 Service Unavailable");
        }
        Ok(schemas
            .iter()
            .enumerate()
            .filter_map(|(idx, schema)| {
                let name = schema.0.get("name")?.as_str()?.to_string();
                Some((name, CommandId(1000 + idx as u64)))
            })
            .collect())
    }
}

pub fn invoker(permissions: Option<Permissions>) -> Invoker {
    Invoker {
        user_id: UserId(7),
        guild_id: permissions.map(|_| GuildId(1)),
        permissions,
    }
}

pub fn command_event(
    command_id: u64,
    name: &str,
    kind: CommandKind,
    options: Vec<OptionData>,
) -> CommandInteraction {
    CommandInteraction {
        command_id: CommandId(command_id),
        name: name.to_string(),
        kind,
        options,
        target_id: None,
        invoker: invoker(Some(Permissions::empty())),
        channel_id: ChannelId(10),
    }
}

pub fn component_event(custom_id: &str, kind: ComponentKind) -> ComponentInteraction {
    ComponentInteraction {
        custom_id: custom_id.to_string(),
        kind,
        values: Vec::new(),
        invoker: invoker(Some(Permissions::empty())),
        channel_id: ChannelId(10),
        message_id: Some(MessageId(20)),
    }
}

pub fn modal_event(custom_id: &str, fields: ModalFields) -> ModalInteraction {
    ModalInteraction {
        custom_id: custom_id.to_string(),
        fields,
        invoker: invoker(Some(Permissions::empty())),
        channel_id: ChannelId(10),
    }
}
