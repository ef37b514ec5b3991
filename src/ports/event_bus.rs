//! Event bus ports.
//!
//! One durable topic exchange connects the services. Delivery is
//! at-least-once and not order-preserving across partitions, so every
//! handler must be idempotent and tolerate out-of-order events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing events onto the shared exchange.
///
/// Publish failures are an operational concern, not a correctness one:
/// callers log and swallow them, because the primary write is already
/// durable by the time an event is emitted.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;
}

/// A consumer callback for one routing-key binding.
///
/// Returning an error signals the broker to redeliver; handlers that
/// cannot make progress on a message (late events, missing targets)
/// should log and return `Ok` to avoid poison re-queues.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError>;
}

/// Port for binding handlers to routing-key patterns
/// (`payment.*`, `subscription.delete`).
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn publisher_is_object_safe(_: &dyn EventPublisher) {}

    #[allow(dead_code)]
    fn subscriber_is_object_safe(_: &dyn EventSubscriber) {}
}
