use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::api::{self, InboundMessage, OutgoingMessage, VkApi};
use crate::error::{ApiError, CallError};
use crate::registry::{Command, CommandContext, CommandRegistry, Reply};

/// A bot message split into its routing parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub sender_id: i64,
    /// Chat id for group messages, sender id otherwise
    pub origin: i64,
    pub is_group: bool,
}

impl ParsedCommand {
    /// `<prefix> <name> [args...]`; `None` when there is no second word.
    pub fn parse(message: &InboundMessage) -> Option<Self> {
        let mut words = message.body.split_whitespace().skip(1);
        let name = words.next()?.to_string();
        Some(Self {
            name,
            args: words.map(str::to_string).collect(),
            sender_id: message.user_id,
            origin: message.origin(),
            is_group: message.is_group(),
        })
    }
}

/// How a single message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    MissingCommand,
    NoRoute(String),
    HandlerFailed { command: String, detail: String },
    NoReply { command: String },
    Replied { command: String, message_id: i64 },
    SendFailed { command: String, error: ApiError },
}

/// Receives every message addressed to the bot, in delivery order.
///
/// [`Router`] is the built-in implementation; a custom one can be handed to
/// [`crate::bot::Bot::with_router`] to take over dispatch entirely. Returning
/// `Err` stops the loop, so only unrecoverable failures should do that.
#[async_trait]
pub trait MessageRouter: Send + Sync {
    async fn route(&self, message: &InboundMessage) -> Result<RouteOutcome, CallError>;
}

/// Dispatches bot messages to registered commands and sends their replies.
pub struct Router<A> {
    api: Arc<A>,
    registry: CommandRegistry,
}

impl<A: VkApi> Router<A> {
    pub fn new(api: Arc<A>, registry: CommandRegistry) -> Self {
        Self { api, registry }
    }
}

#[async_trait]
impl<A: VkApi> MessageRouter for Router<A> {
    /// Route one message. Only a transport failure while sending the reply
    /// is returned as an error; everything else is reported and folded into
    /// the outcome.
    async fn route(&self, message: &InboundMessage) -> Result<RouteOutcome, CallError> {
        info!(
            "A message for the bot received from {} (message {})",
            message.user_id, message.id
        );

        let Some(parsed) = ParsedCommand::parse(message) else {
            warn!("Message {} has no command name, skipping", message.id);
            return Ok(RouteOutcome::MissingCommand);
        };

        let Some(command) = self.registry.get(&parsed.name) else {
            warn!("No available route for '{}', skipping", parsed.name);
            return Ok(RouteOutcome::NoRoute(parsed.name));
        };

        info!("Routing {}...", parsed.name);
        let ctx = CommandContext {
            sender_id: parsed.sender_id,
            args: &parsed.args,
            chat_id: parsed.is_group.then_some(parsed.origin),
        };
        let reply = match invoke_guarded(command, &ctx) {
            Ok(reply) => reply,
            Err(detail) => {
                warn!(
                    "An error occurred in the '{}' command handler: {}",
                    parsed.name, detail
                );
                return Ok(RouteOutcome::HandlerFailed {
                    command: parsed.name,
                    detail,
                });
            }
        };

        let Some(text) = reply.into_text() else {
            debug!("Command '{}' produced no reply", parsed.name);
            return Ok(RouteOutcome::NoReply {
                command: parsed.name,
            });
        };

        let outgoing = OutgoingMessage {
            peer_id: api::peer_id(parsed.origin, parsed.is_group),
            text,
            forward_message_id: message.id,
        };
        match self.api.send_message(&outgoing).await {
            Ok(message_id) => {
                info!("Message sent in a response. Message ID is: {}", message_id);
                Ok(RouteOutcome::Replied {
                    command: parsed.name,
                    message_id,
                })
            }
            Err(CallError::Api(e)) => {
                error!(
                    "VK API returned an error while trying to send a message: {}: {}",
                    e.code, e.message
                );
                Ok(RouteOutcome::SendFailed {
                    command: parsed.name,
                    error: e,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// Run a handler, turning both returned errors and panics into a message.
fn invoke_guarded(command: &Command, ctx: &CommandContext<'_>) -> Result<Reply, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| command.invoke(ctx))) {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(format!("handler panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
