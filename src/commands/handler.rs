//! Command handler traits and type erasure
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Handlers receive extracted arguments instead of raw interactions
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::args::{Args, FromArgs};
use super::invocation::Invocation;
use crate::core::error::DispatchError;
use crate::interactions::respond::AutocompleteChoice;

/// Trait for command leaf handlers
///
/// `A` is the argument type the handler wants. Handlers that read values by
/// position use the default `Args`; handlers with their own struct implement
/// `FromArgs` for it.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl CommandHandler<()> for PingHandler {
///     async fn handle(&self, invocation: Invocation, _args: ()) -> Result<()> {
///         invocation.reply("Pong!").await
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler<A: FromArgs = Args>: Send + Sync + 'static {
    async fn handle(&self, invocation: Invocation, args: A) -> Result<()>;
}

/// A focused option awaiting suggestions
#[derive(Clone)]
pub struct AutocompleteRequest {
    pub invocation: Invocation,
    /// Name of the focused option
    pub option: String,
    /// What the user has typed so far, unparsed
    pub partial: Value,
}

impl AutocompleteRequest {
    /// The partial input as text, whatever its JSON type
    pub fn partial_text(&self) -> String {
        match &self.partial {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait AutocompleteHandler: Send + Sync {
    async fn complete(&self, request: AutocompleteRequest) -> Result<Vec<AutocompleteChoice>>;
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Leaf handler with its argument type erased
///
/// Conversion into the handler's argument type happens before the future is
/// built, so a conversion failure is a dispatch error rather than a handler
/// error.
pub(crate) type ErasedHandler =
    Arc<dyn Fn(Invocation, Args) -> Result<HandlerFuture, DispatchError> + Send + Sync>;

pub(crate) fn erase<A, H>(handler: H) -> ErasedHandler
where
    A: FromArgs,
    H: CommandHandler<A>,
{
    let handler = Arc::new(handler);
    Arc::new(move |invocation: Invocation, args: Args| {
        let typed = A::from_args(args)?;
        let handler = Arc::clone(&handler);
        let future: HandlerFuture = Box::pin(async move { handler.handle(invocation, typed).await });
        Ok(future)
    })
}
