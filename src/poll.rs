use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::api::{InboundMessage, VkApi};
use crate::cursor::{self, Cursor};
use crate::error::CallError;

/// Result of one long-poll history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The fetch succeeded; `messages` are the ones addressed to the bot.
    Messages {
        messages: Vec<InboundMessage>,
        cursor: Cursor,
    },
    /// VK reported an error; nothing to route this cycle.
    Retry,
}

/// Owns the long-poll cursor and turns history fetches into addressed messages.
pub struct Poller<A> {
    api: Arc<A>,
    prefix: String,
    cursor: Cursor,
}

impl<A: VkApi> Poller<A> {
    pub fn new(api: Arc<A>, prefix: impl Into<String>, cursor: Cursor) -> Self {
        Self {
            api,
            prefix: prefix.into(),
            cursor,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fetch everything newer than the current cursor.
    ///
    /// Only transport failures come back as `Err`; VK API errors are
    /// reported and become [`PollOutcome::Retry`]. An expired cursor is
    /// renewed before returning.
    pub async fn poll(&mut self) -> Result<PollOutcome, CallError> {
        match self.api.get_long_poll_history(&self.cursor).await {
            Ok(history) => {
                self.cursor = self.cursor.advance(history.new_pts);
                let messages = filter_addressed(history.messages.items, &self.prefix);
                debug!(
                    "Fetched history up to pts={}, {} message(s) for the bot",
                    self.cursor.pts,
                    messages.len()
                );
                Ok(PollOutcome::Messages {
                    messages,
                    cursor: self.cursor,
                })
            }
            Err(CallError::Api(e)) if e.is_cursor_expired() => {
                warn!("Long-poll cursor expired ({}), renewing session", e.message);
                match cursor::initialize(self.api.as_ref()).await {
                    Ok(fresh) => self.cursor = fresh,
                    // Reported by initialize; the stale cursor will expire again next cycle.
                    Err(CallError::Api(_)) => {}
                    Err(e) => return Err(e),
                }
                Ok(PollOutcome::Retry)
            }
            Err(CallError::Api(e)) => {
                error!(
                    "VK API returned an error while trying to fetch messages: {}: {}",
                    e.code, e.message
                );
                Ok(PollOutcome::Retry)
            }
            Err(e) => Err(e),
        }
    }
}

/// Keep the messages whose body starts with `prefix`, in their original order.
pub fn filter_addressed(items: Vec<InboundMessage>, prefix: &str) -> Vec<InboundMessage> {
    items
        .into_iter()
        .filter(|m| m.body.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::testing::{history, message, Call, FakeApi};

    fn poller(api: &Arc<FakeApi>) -> Poller<FakeApi> {
        Poller::new(Arc::clone(api), "tuxbot", Cursor::new(500, 40))
    }

    #[test]
    fn test_filter_excludes_unprefixed_bodies() {
        let cases = [
            ("tuxbot", "hello tuxbot test", false),
            ("tuxbot", "Tuxbot test", false),
            ("tuxbot", " tuxbot test", false),
            ("tuxbot", "", false),
            ("tuxbot", "tuxbot", true),
            ("tuxbot", "tuxbot greeter Sam", true),
            ("!b", "!b ping", true),
            ("!b", "b ping", false),
            ("a.c", "abc test", false),
        ];
        for (prefix, body, expected) in cases {
            let kept = filter_addressed(vec![message(1, 1, None, body)], prefix);
            assert_eq!(kept.len() == 1, expected, "prefix {prefix:?} body {body:?}");
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let items = vec![
            message(1, 1, None, "tuxbot one"),
            message(2, 1, None, "noise"),
            message(3, 2, Some(4), "tuxbot two"),
            message(4, 3, None, "tuxbot three"),
        ];
        let ids: Vec<i64> = filter_addressed(items, "tuxbot")
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_success_advances_pts_and_keeps_ts() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Ok(history(
            77,
            vec![
                message(1, 10, None, "tuxbot test"),
                message(2, 11, None, "just chatting"),
            ],
        )));
        let mut poller = poller(&api);

        let outcome = poller.poll().await.unwrap();

        let (messages, cursor) = match outcome {
            PollOutcome::Messages { messages, cursor } => (messages, cursor),
            other => panic!("expected messages, got {other:?}"),
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 1);
        assert_eq!(cursor, Cursor::new(500, 77));
        assert_eq!(poller.cursor(), Cursor::new(500, 77));
        assert_eq!(api.calls(), vec![Call::History(Cursor::new(500, 40))]);
    }

    #[tokio::test]
    async fn test_next_fetch_uses_advanced_cursor() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Ok(history(41, vec![])));
        api.push_history(Ok(history(45, vec![])));
        let mut poller = poller(&api);

        poller.poll().await.unwrap();
        poller.poll().await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                Call::History(Cursor::new(500, 40)),
                Call::History(Cursor::new(500, 41)),
            ]
        );
    }

    #[tokio::test]
    async fn test_cursor_expired_reinitializes_once() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Err(ApiError::new(10, "ts expired").into()));
        api.push_server(Ok(Cursor::new(900, 60)));
        let mut poller = poller(&api);

        let outcome = poller.poll().await.unwrap();

        assert_eq!(outcome, PollOutcome::Retry);
        assert_eq!(api.server_calls(), 1);
        assert_eq!(poller.cursor(), Cursor::new(900, 60));
    }

    #[tokio::test]
    async fn test_failed_renewal_keeps_old_cursor() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Err(ApiError::new(10, "ts expired").into()));
        api.push_server(Err(ApiError::new(6, "Too many requests per second").into()));
        let mut poller = poller(&api);

        let outcome = poller.poll().await.unwrap();

        assert_eq!(outcome, PollOutcome::Retry);
        assert_eq!(api.server_calls(), 1);
        assert_eq!(poller.cursor(), Cursor::new(500, 40));
    }

    #[tokio::test]
    async fn test_other_api_error_leaves_cursor_unchanged() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Err(ApiError::new(9, "Flood control").into()));
        let mut poller = poller(&api);

        let outcome = poller.poll().await.unwrap();

        assert_eq!(outcome, PollOutcome::Retry);
        assert_eq!(api.server_calls(), 0);
        assert_eq!(poller.cursor(), Cursor::new(500, 40));
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let api = Arc::new(FakeApi::new());
        api.push_history(Err(CallError::Transport("connection reset".into())));
        let mut poller = poller(&api);

        let err = poller.poll().await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(poller.cursor(), Cursor::new(500, 40));
    }
}
