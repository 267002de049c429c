//! # Command Compiler
//!
//! Turns a `CommandDecl` into a wire schema plus the runtime binding that
//! resolves subcommands, extracts arguments, routes autocomplete and checks
//! permissions.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use serde_json::Value;
use serenity::builder::{CreateApplicationCommand, CreateApplicationCommandOption};
use serenity::model::permissions::Permissions;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::args::{ArgSpec, Args};
use super::declare::{Child, Choice, CommandDecl, OptionDecl, SubcommandDecl};
use super::handler::{AutocompleteHandler, AutocompleteRequest, ErasedHandler};
use super::invocation::Invocation;
use crate::core::error::{DeclarationError, DispatchError};
use crate::interactions::event::{CommandKind, Invoker, OptionData, OptionKind};
use crate::interactions::respond::{AutocompleteChoice, AUTOCOMPLETE_CHOICE_LIMIT};

/// Discord's cap on options, subcommands and choices per level
const MAX_ENTRIES: usize = 25;
const MAX_NAME_LENGTH: usize = 32;
const MAX_DESCRIPTION_LENGTH: usize = 100;

/// A compiled leaf: argument layout, autocomplete routes and the handler
pub(crate) struct Leaf {
    path: String,
    args: Vec<ArgSpec>,
    autocomplete: HashMap<String, Arc<dyn AutocompleteHandler>>,
    handler: ErasedHandler,
}

enum Node {
    Leaf(Leaf),
    Branch {
        subcommands: HashMap<String, Leaf>,
        groups: HashMap<String, HashMap<String, Leaf>>,
    },
}

/// Schema plus dispatch binding of one command; immutable after compile
pub struct CompiledCommand {
    name: String,
    kind: CommandKind,
    schema: CreateApplicationCommand,
    permissions: Option<Permissions>,
    root: Node,
}

impl CommandDecl {
    /// Validate the declaration and build its schema and dispatch tree
    pub fn compile(self) -> Result<CompiledCommand, DeclarationError> {
        let CommandDecl {
            name,
            description,
            kind,
            options,
            handler,
            children,
            permissions,
            dm_permission,
        } = self;

        let mut schema = CreateApplicationCommand::default();
        schema.name(&name).kind(kind.to_serenity());

        match kind {
            CommandKind::ChatInput => {
                check_name(&name)?;
                check_description(&name, &description)?;
                schema.description(&description);
            }
            CommandKind::User | CommandKind::Message => {
                let len = name.chars().count();
                if len == 0 || len > MAX_NAME_LENGTH {
                    return Err(DeclarationError::InvalidName {
                        name,
                        reason: "must be 1-32 characters",
                    });
                }
                if !options.is_empty() || !children.is_empty() {
                    return Err(DeclarationError::ContextMenuOptions(name));
                }
            }
        }

        if let Some(required) = permissions {
            schema.default_member_permissions(required);
        }
        if let Some(allowed) = dm_permission {
            schema.0.insert("dm_permission", Value::Bool(allowed));
        }

        let root = if children.is_empty() {
            let handler = handler.ok_or_else(|| DeclarationError::MissingHandler(name.clone()))?;
            let (option_schemas, leaf) = compile_leaf(&name, options, handler)?;
            for option in option_schemas {
                schema.add_option(option);
            }
            Node::Leaf(leaf)
        } else {
            if !options.is_empty() {
                return Err(DeclarationError::MixedOptionsAndSubcommands(name));
            }
            if handler.is_some() {
                return Err(DeclarationError::HandlerOnBranch(name));
            }
            check_entries(&name, children.iter().map(Child::name))?;

            let mut subcommands = HashMap::new();
            let mut groups = HashMap::new();
            for child in children {
                match child {
                    Child::Subcommand(sub) => {
                        let sub_name = sub.name.clone();
                        let (option, leaf) = compile_subcommand(&name, sub)?;
                        schema.add_option(option);
                        subcommands.insert(sub_name, leaf);
                    }
                    Child::Group(group) => {
                        let path = format!("{name} {}", group.name);
                        check_name(&group.name)?;
                        check_description(&path, &group.description)?;
                        if group.subcommands.is_empty() {
                            return Err(DeclarationError::MissingHandler(path));
                        }
                        check_entries(&path, group.subcommands.iter().map(|s| s.name.as_str()))?;

                        let mut option = CreateApplicationCommandOption::default();
                        option
                            .kind(OptionKind::SubCommandGroup.to_serenity())
                            .name(&group.name)
                            .description(&group.description);

                        let mut leaves = HashMap::new();
                        for sub in group.subcommands {
                            let sub_name = sub.name.clone();
                            let (sub_option, leaf) = compile_subcommand(&path, sub)?;
                            option.add_sub_option(sub_option);
                            leaves.insert(sub_name, leaf);
                        }
                        schema.add_option(option);
                        groups.insert(group.name, leaves);
                    }
                }
            }
            Node::Branch {
                subcommands,
                groups,
            }
        };

        Ok(CompiledCommand {
            name,
            kind,
            schema,
            permissions,
            root,
        })
    }
}

impl CompiledCommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The wire schema to register with the platform
    pub fn schema(&self) -> &CreateApplicationCommand {
        &self.schema
    }

    pub fn required_permissions(&self) -> Option<Permissions> {
        self.permissions
    }

    /// Verify the invoker holds the declared permissions
    ///
    /// An invoker without resolved permissions (a DM) fails whenever a
    /// requirement exists.
    pub fn check_permissions(&self, invoker: &Invoker) -> Result<(), DispatchError> {
        let required = match self.permissions {
            Some(required) if !required.is_empty() => required,
            _ => return Ok(()),
        };
        match invoker.permissions {
            Some(granted) if granted.contains(required) => Ok(()),
            _ => Err(DispatchError::NoPermission { required }),
        }
    }

    /// Resolve the leaf, extract its arguments and run its handler
    pub async fn dispatch(&self, invocation: Invocation) -> Result<(), DispatchError> {
        self.check_permissions(&invocation.interaction.invoker)?;

        let (leaf, options) = self.resolve(&invocation.interaction.options)?;
        let args = Args::extract(&leaf.args, options)?;
        log::debug!("Dispatching '{}' with {} argument(s)", leaf.path, args.len());

        let future = (leaf.handler)(invocation, args)?;
        future.await.map_err(DispatchError::Handler)
    }

    /// Route an autocomplete request to the focused option's handler
    ///
    /// Returned choices are cut to the platform limit.
    pub async fn autocomplete(
        &self,
        invocation: Invocation,
    ) -> Result<Vec<AutocompleteChoice>, DispatchError> {
        self.check_permissions(&invocation.interaction.invoker)?;

        let (leaf, options) = self.resolve(&invocation.interaction.options)?;
        let focused = options.iter().find(|opt| opt.focused);
        let (handler, focused) = match focused {
            Some(opt) => match leaf.autocomplete.get(&opt.name) {
                Some(handler) => (Arc::clone(handler), opt),
                None => {
                    return Err(DispatchError::OptionNotAutocompletable {
                        command: leaf.path.clone(),
                        option: opt.name.clone(),
                    })
                }
            },
            None => {
                return Err(DispatchError::OptionNotAutocompletable {
                    command: leaf.path.clone(),
                    option: "<none focused>".to_string(),
                })
            }
        };

        let request = AutocompleteRequest {
            option: focused.name.clone(),
            partial: focused.value.clone().unwrap_or(Value::Null),
            invocation,
        };
        let mut choices = handler.complete(request).await?;
        choices.truncate(AUTOCOMPLETE_CHOICE_LIMIT);
        Ok(choices)
    }

    /// Walk group and subcommand names down to a leaf
    fn resolve<'a, 'b>(
        &'a self,
        options: &'b [OptionData],
    ) -> Result<(&'a Leaf, &'b [OptionData]), DispatchError> {
        let (subcommands, groups) = match &self.root {
            Node::Leaf(leaf) => return Ok((leaf, options)),
            Node::Branch {
                subcommands,
                groups,
            } => (subcommands, groups),
        };

        let first = options.first();
        match first {
            Some(group) if group.kind == OptionKind::SubCommandGroup => {
                let leaves = groups.get(&group.name).ok_or_else(|| {
                    DispatchError::SubcommandGroupNotFound {
                        command: self.name.clone(),
                        group: group.name.clone(),
                    }
                })?;
                let command = format!("{} {}", self.name, group.name);
                let sub = group
                    .options
                    .first()
                    .filter(|opt| opt.kind == OptionKind::SubCommand);
                let sub_name = sub.map(|opt| opt.name.clone()).unwrap_or_default();
                match sub.and_then(|opt| leaves.get(&opt.name).map(|leaf| (leaf, opt))) {
                    Some((leaf, opt)) => Ok((leaf, &opt.options)),
                    None => Err(DispatchError::SubcommandNotFound {
                        command,
                        subcommand: sub_name,
                    }),
                }
            }
            Some(sub) if sub.kind == OptionKind::SubCommand => subcommands
                .get(&sub.name)
                .map(|leaf| (leaf, sub.options.as_slice()))
                .ok_or_else(|| DispatchError::SubcommandNotFound {
                    command: self.name.clone(),
                    subcommand: sub.name.clone(),
                }),
            other => Err(DispatchError::SubcommandNotFound {
                command: self.name.clone(),
                subcommand: other.map(|opt| opt.name.clone()).unwrap_or_default(),
            }),
        }
    }
}

fn compile_subcommand(
    parent: &str,
    sub: SubcommandDecl,
) -> Result<(CreateApplicationCommandOption, Leaf), DeclarationError> {
    let path = format!("{parent} {}", sub.name);
    check_name(&sub.name)?;
    check_description(&path, &sub.description)?;
    let handler = sub
        .handler
        .ok_or_else(|| DeclarationError::MissingHandler(path.clone()))?;

    let (option_schemas, leaf) = compile_leaf(&path, sub.options, handler)?;

    let mut option = CreateApplicationCommandOption::default();
    option
        .kind(OptionKind::SubCommand.to_serenity())
        .name(&sub.name)
        .description(&sub.description);
    for sub_option in option_schemas {
        option.add_sub_option(sub_option);
    }
    Ok((option, leaf))
}

fn compile_leaf(
    path: &str,
    options: Vec<OptionDecl>,
    handler: ErasedHandler,
) -> Result<(Vec<CreateApplicationCommandOption>, Leaf), DeclarationError> {
    check_entries(path, options.iter().map(|opt| opt.name.as_str()))?;

    let mut schemas = Vec::with_capacity(options.len());
    let mut args = Vec::with_capacity(options.len());
    let mut autocomplete = HashMap::new();
    let mut seen_optional = false;

    for decl in options {
        if decl.required && seen_optional {
            return Err(invalid_option(
                path,
                &decl,
                "required options must precede optional ones",
            ));
        }
        seen_optional |= !decl.required;

        schemas.push(option_schema(path, &decl)?);
        args.push(ArgSpec {
            name: decl.name.clone(),
            kind: decl.kind,
            required: decl.required,
        });
        if let Some(handler) = decl.autocomplete {
            autocomplete.insert(decl.name, handler);
        }
    }

    Ok((
        schemas,
        Leaf {
            path: path.to_string(),
            args,
            autocomplete,
            handler,
        },
    ))
}

fn option_schema(
    path: &str,
    decl: &OptionDecl,
) -> Result<CreateApplicationCommandOption, DeclarationError> {
    check_name(&decl.name)?;
    check_description(&format!("{path} {}", decl.name), &decl.description)?;

    let kind = decl.kind;
    let fail = |reason| Err(invalid_option(path, decl, reason));

    if decl.choices.len() > MAX_ENTRIES {
        return fail("at most 25 choices are allowed");
    }
    if !decl.choices.is_empty() && decl.autocomplete.is_some() {
        return fail("choices and autocomplete are mutually exclusive");
    }
    if decl.autocomplete.is_some() && !kind.supports_autocomplete() {
        return fail("autocomplete requires a string, integer or number option");
    }
    if decl.choices.iter().any(|choice| choice.kind() != kind) {
        return fail("choice value does not match the option type");
    }
    if (decl.min_length.is_some() || decl.max_length.is_some()) && kind != OptionKind::String {
        return fail("length limits apply only to string options");
    }
    if (decl.min_value.is_some() || decl.max_value.is_some())
        && !matches!(kind, OptionKind::Integer | OptionKind::Number)
    {
        return fail("value limits apply only to integer and number options");
    }
    if matches!((decl.min_length, decl.max_length), (Some(min), Some(max)) if min > max)
        || matches!((decl.min_value, decl.max_value), (Some(min), Some(max)) if min > max)
    {
        return fail("minimum exceeds maximum");
    }
    if !decl.channel_types.is_empty() && kind != OptionKind::Channel {
        return fail("channel types apply only to channel options");
    }

    let mut option = CreateApplicationCommandOption::default();
    option
        .name(&decl.name)
        .description(&decl.description)
        .kind(kind.to_serenity())
        .required(decl.required);

    for choice in &decl.choices {
        match choice {
            Choice::String { name, value } => {
                option.add_string_choice(name, value);
            }
            Choice::Integer { name, value } => {
                option.add_int_choice(name, *value);
            }
            Choice::Number { name, value } => {
                option.add_number_choice(name, *value);
            }
        }
    }
    if decl.autocomplete.is_some() {
        option.set_autocomplete(true);
    }
    if let Some(min) = decl.min_length {
        option.min_length(min);
    }
    if let Some(max) = decl.max_length {
        option.max_length(max);
    }
    // Integer limits must serialize as integers
    for (key, limit) in [("min_value", decl.min_value), ("max_value", decl.max_value)] {
        if let Some(limit) = limit {
            let value = match kind {
                OptionKind::Integer => Value::from(limit as i64),
                _ => Value::from(limit),
            };
            option.0.insert(key, value);
        }
    }
    if !decl.channel_types.is_empty() {
        option.channel_types(&decl.channel_types);
    }

    Ok(option)
}

fn invalid_option(path: &str, decl: &OptionDecl, reason: &'static str) -> DeclarationError {
    DeclarationError::InvalidOption {
        path: path.to_string(),
        option: decl.name.clone(),
        reason,
    }
}

/// Discord's name grammar: 1-32 lowercase letters, digits, `-` or `_`
fn check_name(name: &str) -> Result<(), DeclarationError> {
    let len = name.chars().count();
    let reason = if len == 0 || len > MAX_NAME_LENGTH {
        "must be 1-32 characters"
    } else if !name
        .chars()
        .all(|c| c == '-' || c == '_' || c.is_lowercase() || c.is_numeric())
    {
        "only lowercase letters, digits, '-' and '_' are allowed"
    } else {
        return Ok(());
    };
    Err(DeclarationError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn check_description(path: &str, description: &str) -> Result<(), DeclarationError> {
    let len = description.chars().count();
    if len == 0 || len > MAX_DESCRIPTION_LENGTH {
        return Err(DeclarationError::InvalidDescription {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// At most 25 entries per level, names unique within the level
fn check_entries<'a>(
    path: &str,
    names: impl ExactSizeIterator<Item = &'a str>,
) -> Result<(), DeclarationError> {
    if names.len() > MAX_ENTRIES {
        return Err(DeclarationError::TooManyEntries(path.to_string()));
    }
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DeclarationError::DuplicateName {
                registry: "option",
                name: format!("{path} {name}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::declare::{GroupDecl, SubcommandDecl};
    use crate::commands::handler::CommandHandler;
    use crate::interactions::event::CommandInteraction;
    use crate::testing::{command_event, invoker, RecordingResponder, Response};
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with the string form of every argument
    struct Describe;

    #[async_trait]
    impl CommandHandler for Describe {
        async fn handle(&self, invocation: Invocation, args: Args) -> Result<()> {
            let parts: Vec<String> = (0..args.len())
                .map(|i| format!("{:?}", args.get(i)))
                .collect();
            invocation.reply(parts.join(",")).await
        }
    }

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandHandler<()> for Counting {
        async fn handle(&self, _invocation: Invocation, _args: ()) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Many;

    #[async_trait]
    impl AutocompleteHandler for Many {
        async fn complete(&self, request: AutocompleteRequest) -> Result<Vec<AutocompleteChoice>> {
            let prefix = request.partial_text();
            Ok((0..40)
                .map(|i| AutocompleteChoice::string(format!("{prefix}{i}"), i.to_string()))
                .collect())
        }
    }

    fn invocation(
        interaction: CommandInteraction,
    ) -> (Invocation, Arc<RecordingResponder>) {
        let responder = Arc::new(RecordingResponder::new());
        (Invocation::new(interaction, responder.clone()), responder)
    }

    fn schema_options(compiled: &CompiledCommand) -> Vec<Value> {
        compiled
            .schema()
            .0
            .get("options")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_leaf_schema() {
        let compiled = CommandDecl::slash("remind", "Set a reminder")
            .option(
                OptionDecl::string("text", "What to remember")
                    .required(true)
                    .min_length(1)
                    .max_length(200),
            )
            .option(OptionDecl::integer("minutes", "Delay").min_value(1.0))
            .option(OptionDecl::string("zone", "Time zone").string_choice("UTC", "utc"))
            .default_member_permissions(Permissions::MANAGE_GUILD)
            .dm_permission(false)
            .handler(Describe)
            .compile()
            .unwrap();

        assert_eq!(compiled.name(), "remind");
        assert_eq!(compiled.schema().0.get("name").unwrap(), "remind");
        assert_eq!(compiled.schema().0.get("dm_permission").unwrap(), false);
        assert!(compiled.schema().0.contains_key("default_member_permissions"));

        let options = schema_options(&compiled);
        assert_eq!(options.len(), 3);
        assert_eq!(options[0]["name"], "text");
        assert_eq!(options[0]["required"], true);
        assert_eq!(options[0]["max_length"], 200);
        assert_eq!(options[1]["min_value"], json!(1));
        assert_eq!(options[2]["choices"][0]["value"], "utc");
    }

    #[test]
    fn test_branch_schema_nests_groups() {
        let compiled = CommandDecl::slash("config", "Configure")
            .subcommand(SubcommandDecl::new("show", "Show config").handler(Describe))
            .group(
                GroupDecl::new("alerts", "Alert settings")
                    .subcommand(SubcommandDecl::new("on", "Enable").handler(Describe))
                    .subcommand(SubcommandDecl::new("off", "Disable").handler(Describe)),
            )
            .compile()
            .unwrap();

        let options = schema_options(&compiled);
        assert_eq!(options.len(), 2);
        assert_eq!(options[1]["name"], "alerts");
        assert_eq!(options[1]["options"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_mixed_options_and_subcommands_rejected() {
        let result = CommandDecl::slash("mixed", "Mixed levels")
            .option(OptionDecl::string("x", "x"))
            .subcommand(SubcommandDecl::new("sub", "Sub").handler(Describe))
            .compile();
        assert_eq!(
            result.err(),
            Some(DeclarationError::MixedOptionsAndSubcommands("mixed".into()))
        );
    }

    #[test]
    fn test_branch_with_handler_rejected() {
        let result = CommandDecl::slash("branch", "Branch")
            .subcommand(SubcommandDecl::new("sub", "Sub").handler(Describe))
            .handler(Describe)
            .compile();
        assert!(matches!(result, Err(DeclarationError::HandlerOnBranch(_))));
    }

    #[test]
    fn test_missing_handler_rejected() {
        let result = CommandDecl::slash("empty", "No handler").compile();
        assert!(matches!(result, Err(DeclarationError::MissingHandler(_))));

        let result = CommandDecl::slash("parent", "Parent")
            .subcommand(SubcommandDecl::new("child", "No handler"))
            .compile();
        assert_eq!(
            result.err(),
            Some(DeclarationError::MissingHandler("parent child".into()))
        );
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let result = CommandDecl::slash("order", "Order")
            .option(OptionDecl::string("a", "a"))
            .option(OptionDecl::string("b", "b").required(true))
            .handler(Describe)
            .compile();
        assert!(matches!(
            result,
            Err(DeclarationError::InvalidOption { option, .. }) if option == "b"
        ));
    }

    #[test]
    fn test_option_constraint_validation() {
        struct Noop;
        #[async_trait]
        impl AutocompleteHandler for Noop {
            async fn complete(&self, _r: AutocompleteRequest) -> Result<Vec<AutocompleteChoice>> {
                Ok(Vec::new())
            }
        }

        let cases = vec![
            OptionDecl::string("x", "x")
                .string_choice("a", "a")
                .autocomplete(Arc::new(Noop)),
            OptionDecl::boolean("x", "x").autocomplete(Arc::new(Noop)),
            OptionDecl::integer("x", "x").min_length(2),
            OptionDecl::string("x", "x").min_value(2.0),
            OptionDecl::integer("x", "x").string_choice("a", "a"),
            OptionDecl::string("x", "x").channel_types(&[serenity::model::channel::ChannelType::Text]),
            OptionDecl::number("x", "x").min_value(5.0).max_value(1.0),
        ];

        for option in cases {
            let result = CommandDecl::slash("check", "Check")
                .option(option)
                .handler(Describe)
                .compile();
            assert!(matches!(result, Err(DeclarationError::InvalidOption { .. })));
        }
    }

    #[test]
    fn test_name_and_description_rules() {
        assert!(matches!(
            CommandDecl::slash("Upper", "desc").handler(Describe).compile(),
            Err(DeclarationError::InvalidName { .. })
        ));
        assert!(matches!(
            CommandDecl::slash(&"a".repeat(33), "desc").handler(Describe).compile(),
            Err(DeclarationError::InvalidName { .. })
        ));
        assert!(matches!(
            CommandDecl::slash("ok", "").handler(Describe).compile(),
            Err(DeclarationError::InvalidDescription { .. })
        ));
        assert!(matches!(
            CommandDecl::slash("ok", &"d".repeat(101)).handler(Describe).compile(),
            Err(DeclarationError::InvalidDescription { .. })
        ));
        assert!(CommandDecl::slash("sub-scription_2", "fine")
            .handler(Describe)
            .compile()
            .is_ok());
    }

    #[test]
    fn test_context_menu_rules() {
        let compiled = CommandDecl::user("Show Subscription")
            .handler(Describe)
            .compile()
            .unwrap();
        assert_eq!(compiled.kind(), CommandKind::User);

        let result = CommandDecl::message("Quote")
            .option(OptionDecl::string("x", "x"))
            .handler(Describe)
            .compile();
        assert_eq!(
            result.err(),
            Some(DeclarationError::ContextMenuOptions("Quote".into()))
        );
    }

    #[test]
    fn test_entry_limits() {
        let mut decl = CommandDecl::slash("wide", "Too many options");
        for i in 0..26 {
            decl = decl.option(OptionDecl::string(&format!("o{i}"), "opt"));
        }
        assert_eq!(
            decl.handler(Describe).compile().err(),
            Some(DeclarationError::TooManyEntries("wide".into()))
        );

        let result = CommandDecl::slash("dup", "Duplicate options")
            .option(OptionDecl::string("a", "a"))
            .option(OptionDecl::string("a", "a"))
            .handler(Describe)
            .compile();
        assert!(matches!(result, Err(DeclarationError::DuplicateName { .. })));
    }

    #[tokio::test]
    async fn test_dispatch_extracts_positional_args() {
        let compiled = CommandDecl::slash("greet", "Greet")
            .option(OptionDecl::string("name", "Name").required(true))
            .option(OptionDecl::integer("times", "Times"))
            .option(OptionDecl::boolean("loud", "Loud"))
            .handler(Describe)
            .compile()
            .unwrap();

        let event = command_event(
            1,
            "greet",
            CommandKind::ChatInput,
            vec![
                OptionData::value("loud", OptionKind::Boolean, json!(true)),
                OptionData::value("name", OptionKind::String, json!("ada")),
            ],
        );
        let (invocation, responder) = invocation(event);
        compiled.dispatch(invocation).await.unwrap();

        match &responder.responses()[0] {
            Response::Reply(reply) => {
                assert_eq!(reply.content, "String(\"ada\"),Absent,Boolean(true)")
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_resolves_group_and_subcommand() {
        let on = Counting::default();
        let off = Counting::default();
        let compiled = CommandDecl::slash("config", "Configure")
            .group(
                GroupDecl::new("alerts", "Alerts")
                    .subcommand(SubcommandDecl::new("on", "On").handler(on.clone()))
                    .subcommand(SubcommandDecl::new("off", "Off").handler(off.clone())),
            )
            .compile()
            .unwrap();

        let event = command_event(
            1,
            "config",
            CommandKind::ChatInput,
            vec![OptionData::group("alerts", OptionData::subcommand("off", vec![]))],
        );
        compiled.dispatch(invocation(event).0).await.unwrap();
        assert_eq!(on.0.load(Ordering::SeqCst), 0);
        assert_eq!(off.0.load(Ordering::SeqCst), 1);

        let event = command_event(
            1,
            "config",
            CommandKind::ChatInput,
            vec![OptionData::group("alerts", OptionData::subcommand("maybe", vec![]))],
        );
        assert!(matches!(
            compiled.dispatch(invocation(event).0).await,
            Err(DispatchError::SubcommandNotFound { subcommand, .. }) if subcommand == "maybe"
        ));

        let event = command_event(
            1,
            "config",
            CommandKind::ChatInput,
            vec![OptionData::group("sounds", OptionData::subcommand("on", vec![]))],
        );
        assert!(matches!(
            compiled.dispatch(invocation(event).0).await,
            Err(DispatchError::SubcommandGroupNotFound { group, .. }) if group == "sounds"
        ));
    }

    #[tokio::test]
    async fn test_permission_check_short_circuits() {
        let counter = Counting::default();
        let compiled = CommandDecl::slash("purge", "Purge")
            .default_member_permissions(Permissions::MANAGE_MESSAGES)
            .handler(counter.clone())
            .compile()
            .unwrap();

        let event = command_event(1, "purge", CommandKind::ChatInput, vec![]);
        let result = compiled.dispatch(invocation(event).0).await;
        assert!(matches!(result, Err(DispatchError::NoPermission { .. })));

        // DM invoker has no resolved permissions
        let mut event = command_event(1, "purge", CommandKind::ChatInput, vec![]);
        event.invoker = invoker(None);
        assert!(compiled.dispatch(invocation(event).0).await.is_err());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        let mut event = command_event(1, "purge", CommandKind::ChatInput, vec![]);
        event.invoker = invoker(Some(Permissions::MANAGE_MESSAGES | Permissions::SEND_MESSAGES));
        compiled.dispatch(invocation(event).0).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_autocomplete_routes_focused_option_and_truncates() {
        let compiled = CommandDecl::slash("pick", "Pick")
            .option(OptionDecl::string("item", "Item").autocomplete(Arc::new(Many)))
            .option(OptionDecl::string("note", "Note"))
            .handler(Describe)
            .compile()
            .unwrap();

        let event = command_event(
            1,
            "pick",
            CommandKind::ChatInput,
            vec![OptionData::value("item", OptionKind::String, json!("ab")).focused()],
        );
        let choices = compiled.autocomplete(invocation(event).0).await.unwrap();
        assert_eq!(choices.len(), AUTOCOMPLETE_CHOICE_LIMIT);
        assert_eq!(choices[0].name, "ab0");

        let event = command_event(
            1,
            "pick",
            CommandKind::ChatInput,
            vec![OptionData::value("note", OptionKind::String, json!("x")).focused()],
        );
        assert!(matches!(
            compiled.autocomplete(invocation(event).0).await,
            Err(DispatchError::OptionNotAutocompletable { option, .. }) if option == "note"
        ));

        let event = command_event(1, "pick", CommandKind::ChatInput, vec![]);
        assert!(matches!(
            compiled.autocomplete(invocation(event).0).await,
            Err(DispatchError::OptionNotAutocompletable { .. })
        ));
    }
}
