pub mod client;
pub mod retry;

use async_trait::async_trait;
use serde::Deserialize;

use crate::cursor::Cursor;
use crate::error::{ApiError, CallError};

/// VK addresses multi-party chats as `chat_id + 2000000000` when sending.
pub const GROUP_PEER_OFFSET: i64 = 2_000_000_000;

/// The three VK methods the bot relies on.
#[async_trait]
pub trait VkApi: Send + Sync {
    /// `messages.getLongPollServer` with `need_pts=1`.
    async fn get_long_poll_server(&self) -> Result<Cursor, CallError>;

    /// `messages.getLongPollHistory` starting at `cursor`.
    async fn get_long_poll_history(&self, cursor: &Cursor) -> Result<History, CallError>;

    /// `messages.send`; returns the id of the new message.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<i64, CallError>;
}

/// A message delivered by `messages.getLongPollHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub id: i64,
    pub user_id: i64,
    /// Present only for messages sent to a multi-party chat.
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default, alias = "text")]
    pub body: String,
}

impl InboundMessage {
    pub fn is_group(&self) -> bool {
        self.chat_id.is_some()
    }

    /// Where a reply should go: the chat for group messages, the sender otherwise.
    pub fn origin(&self) -> i64 {
        self.chat_id.unwrap_or(self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct History {
    pub new_pts: u64,
    pub messages: MessageItems,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageItems {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<InboundMessage>,
}

/// A reply to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub peer_id: i64,
    pub text: String,
    /// Id of the inbound message the reply forwards.
    pub forward_message_id: i64,
}

/// `peer_id` for a reply to `origin` (a chat id when `is_group`, a user id otherwise).
pub fn peer_id(origin: i64, is_group: bool) -> i64 {
    if is_group {
        origin + GROUP_PEER_OFFSET
    } else {
        origin
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// Top-level VK response: exactly one of `response` or `error` is set.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    response: Option<T>,
    error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub(crate) fn into_result(self) -> Result<T, CallError> {
        if let Some(err) = self.error {
            return Err(ApiError::new(err.error_code, err.error_msg).into());
        }
        self.response
            .ok_or_else(|| CallError::Decode("response has neither 'response' nor 'error'".into()))
    }
}
