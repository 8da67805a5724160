use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{History, InboundMessage, MessageItems, OutgoingMessage, VkApi};
use crate::cursor::Cursor;
use crate::error::CallError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Server,
    History(Cursor),
    Send(OutgoingMessage),
}

/// Answers each method from its own queue and records every call.
/// `send_message` succeeds with increasing ids once its queue is empty.
#[derive(Default)]
pub struct FakeApi {
    servers: Mutex<VecDeque<Result<Cursor, CallError>>>,
    histories: Mutex<VecDeque<Result<History, CallError>>>,
    sends: Mutex<VecDeque<Result<i64, CallError>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_server(&self, result: Result<Cursor, CallError>) {
        self.servers.lock().unwrap().push_back(result);
    }

    pub fn push_history(&self, result: Result<History, CallError>) {
        self.histories.lock().unwrap().push_back(result);
    }

    pub fn push_send(&self, result: Result<i64, CallError>) {
        self.sends.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn server_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Server))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VkApi for FakeApi {
    async fn get_long_poll_server(&self) -> Result<Cursor, CallError> {
        self.record(Call::Server);
        self.servers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CallError::Transport("no scripted server response".into())))
    }

    async fn get_long_poll_history(&self, cursor: &Cursor) -> Result<History, CallError> {
        self.record(Call::History(*cursor));
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CallError::Transport("no scripted history response".into())))
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<i64, CallError> {
        self.record(Call::Send(message.clone()));
        let sent_so_far = self.sent().len() as i64;
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(1000 + sent_so_far))
    }
}

pub fn message(id: i64, user_id: i64, chat_id: Option<i64>, body: &str) -> InboundMessage {
    InboundMessage {
        id,
        user_id,
        chat_id,
        body: body.to_string(),
    }
}

pub fn history(new_pts: u64, items: Vec<InboundMessage>) -> History {
    History {
        new_pts,
        messages: MessageItems {
            count: items.len() as u64,
            items,
        },
    }
}
