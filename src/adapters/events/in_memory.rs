//! In-memory event bus.
//!
//! Synchronous, deterministic delivery for tests and single-process
//! wiring: `publish` dispatches to every matching handler before it
//! returns, and captures each envelope for assertions.
//!
//! Pattern matching follows the glob semantics of the deployed bus: a
//! trailing `*` matches any suffix, so `payment.*` catches
//! `payment.completed.subscription`.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

pub struct InMemoryEventBus {
    handlers: RwLock<Vec<(String, Arc<dyn EventHandler>)>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
        }
    }

    fn matches(pattern: &str, routing_key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => routing_key.starts_with(prefix),
            None => routing_key == pattern,
        }
    }

    // === Test helpers ===

    /// Every envelope published so far.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published.read().expect("bus lock poisoned").clone()
    }

    /// Envelopes whose routing key equals `key`.
    pub fn events_for_key(&self, key: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.routing_key() == key)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published.read().expect("bus lock poisoned").len()
    }

    pub fn clear(&self) {
        self.published.write().expect("bus lock poisoned").clear();
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .expect("bus lock poisoned")
            .push(event.clone());

        // Snapshot matching handlers so no lock is held across awaits.
        let key = event.routing_key();
        let matching: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().expect("bus lock poisoned");
            handlers
                .iter()
                .filter(|(pattern, _)| Self::matches(pattern, &key))
                .map(|(_, h)| h.clone())
                .collect()
        };

        for handler in matching {
            if let Err(err) = handler.handle(event.clone()).await {
                // The real broker would redeliver; here we only log.
                tracing::warn!(routing_key = %key, error = %err, "in-memory handler failed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for InMemoryEventBus {
    async fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError> {
        self.handlers
            .write()
            .expect("bus lock poisoned")
            .push((pattern.to_string(), handler));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[async_trait]
    impl EventHandler for Counter {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn pattern_matching_supports_trailing_glob() {
        assert!(InMemoryEventBus::matches("payment.*", "payment.completed.subscription"));
        assert!(InMemoryEventBus::matches("payment.*", "payment.failed.inscription"));
        assert!(InMemoryEventBus::matches("subscription.delete", "subscription.delete"));
        assert!(!InMemoryEventBus::matches("subscription.delete", "subscription.update"));
        assert!(!InMemoryEventBus::matches("payment.*", "subscription.delete"));
    }

    #[tokio::test]
    async fn publish_reaches_matching_handlers_only() {
        let bus = InMemoryEventBus::new();
        let payments = Arc::new(Counter(AtomicUsize::new(0)));
        let cancellations = Arc::new(Counter(AtomicUsize::new(0)));
        bus.subscribe("payment.*", payments.clone()).await.unwrap();
        bus.subscribe("subscription.delete", cancellations.clone()).await.unwrap();

        bus.publish(
            EventEnvelope::new("payment.completed", "payment", "p", json!({}))
                .with_routing_key("payment.completed.subscription"),
        )
        .await
        .unwrap();
        bus.publish(EventEnvelope::new("delete", "subscription", "s", json!({})))
            .await
            .unwrap();
        bus.publish(EventEnvelope::new("update", "subscription", "s", json!({})))
            .await
            .unwrap();

        assert_eq!(payments.0.load(Ordering::SeqCst), 1);
        assert_eq!(cancellations.0.load(Ordering::SeqCst), 1);
        assert_eq!(bus.event_count(), 3);
    }

    #[tokio::test]
    async fn handler_errors_do_not_fail_publish() {
        struct Failing;

        #[async_trait]
        impl EventHandler for Failing {
            async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
                Err(DomainError::internal("boom"))
            }
        }

        let bus = InMemoryEventBus::new();
        bus.subscribe("activity.*", Arc::new(Failing)).await.unwrap();
        let result = bus
            .publish(EventEnvelope::new("create", "activity", "1", json!({})))
            .await;
        assert!(result.is_ok());
    }
}
