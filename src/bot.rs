use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::VkApi;
use crate::cursor;
use crate::poll::{PollOutcome, Poller};
use crate::registry::CommandRegistry;
use crate::router::{MessageRouter, RouteOutcome, Router};

/// What happened during one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// VK reported an error and the cycle routed nothing
    pub retry: bool,
    /// One entry per routed message, in delivery order
    pub outcomes: Vec<RouteOutcome>,
}

/// The long-poll bot: one cursor, one message router, one cycle at a time.
pub struct Bot<A, R = Router<A>> {
    poller: Poller<A>,
    router: R,
    poll_interval: Duration,
}

impl<A: VkApi> Bot<A> {
    /// Open a long-poll session and dispatch to the commands in `registry`.
    /// Fails if VK refuses the session or stays unreachable.
    pub async fn start(
        api: Arc<A>,
        prefix: impl Into<String>,
        registry: CommandRegistry,
        poll_interval: Duration,
    ) -> Result<Self> {
        let router = Router::new(Arc::clone(&api), registry);
        Self::with_router(api, prefix, router, poll_interval).await
    }
}

impl<A: VkApi, R: MessageRouter> Bot<A, R> {
    /// Like [`Bot::start`], but every addressed message goes to `router`
    /// instead of the command registry.
    pub async fn with_router(
        api: Arc<A>,
        prefix: impl Into<String>,
        router: R,
        poll_interval: Duration,
    ) -> Result<Self> {
        let cursor = cursor::initialize(api.as_ref())
            .await
            .context("Failed to open a long-poll session")?;

        Ok(Self {
            poller: Poller::new(api, prefix, cursor),
            router,
            poll_interval,
        })
    }

    pub fn poller(&self) -> &Poller<A> {
        &self.poller
    }

    /// Fetch once and route every addressed message before returning.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let outcome = self
            .poller
            .poll()
            .await
            .context("Couldn't fetch a response from VK API")?;

        let messages = match outcome {
            PollOutcome::Messages { messages, cursor } => {
                debug!(
                    "Routing {} message(s), next fetch from ts={} pts={}",
                    messages.len(),
                    cursor.ts,
                    cursor.pts
                );
                messages
            }
            PollOutcome::Retry => {
                return Ok(CycleReport {
                    retry: true,
                    outcomes: Vec::new(),
                })
            }
        };

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in &messages {
            let outcome = self
                .router
                .route(message)
                .await
                .context("Couldn't deliver a reply through VK API")?;
            debug!("Message {} routed: {:?}", message.id, outcome);
            outcomes.push(outcome);
        }

        Ok(CycleReport {
            retry: false,
            outcomes,
        })
    }

    /// Poll forever, sleeping `poll_interval` after every cycle.
    /// Returns only when a transport failure outlasts the retry policy.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Listening for '{}' messages, polling every {:?}",
            self.poller.prefix(),
            self.poll_interval
        );

        loop {
            self.run_cycle().await?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
