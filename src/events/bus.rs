//! Typed in-process publish/subscribe hub
//!
//! Delivery is synchronous on the publisher's execution context, in
//! subscriber-registration order. There is no backlog or replay: a
//! subscriber only sees events published after it subscribed. A handler
//! error is logged and does not stop delivery to later subscribers.

use crate::error::Result;
use crate::events::messages::{Event, Topic};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

type Handler = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// The in-process event bus connecting queue, games and substitution
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<Topic, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a single topic.
    ///
    /// Handlers run synchronously during `publish` and must not block.
    pub fn subscribe<F>(&self, topic: Topic, handler: F)
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(topic).or_default().push(Arc::new(handler));
    }

    /// Deliver an event to every subscriber of its topic.
    ///
    /// The subscriber list is snapshotted before dispatch so handlers may
    /// publish further events (or subscribe) without deadlocking.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        let handlers: Vec<Handler> = {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            subscribers.get(&topic).cloned().unwrap_or_default()
        };

        debug!(?topic, subscribers = handlers.len(), "publishing event");

        for handler in handlers {
            if let Err(e) = handler(&event) {
                // Isolate subscriber failures; remaining subscribers still run.
                error!(?topic, error = %e, "event subscriber failed");
            }
        }
    }

    /// Number of subscribers currently registered for a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&topic)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }
}
