//! Redis pub/sub event bus.
//!
//! Each envelope is published on a channel named by its routing key;
//! consumers pattern-subscribe (`payment.*`, `subscription.delete`).
//! Durable topic-exchange semantics belong to the deployed broker; this
//! adapter only promises at-least-once delivery to idempotent handlers,
//! which is what every consumer in the system is written for.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// Publisher side: one multiplexed connection shared by all requests.
pub struct RedisEventBus {
    connection: MultiplexedConnection,
}

impl RedisEventBus {
    pub async fn connect(url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(url)
            .map_err(|e| DomainError::internal(format!("invalid redis url: {}", e)))?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| DomainError::internal(format!("redis connect failed: {}", e)))?;
        tracing::info!("connected to event bus");
        Ok(Self { connection })
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let key = event.routing_key();
        let body = serde_json::to_string(&event)
            .map_err(|e| DomainError::internal(format!("event serialization failed: {}", e)))?;

        let mut connection = self.connection.clone();
        redis::cmd("PUBLISH")
            .arg(&key)
            .arg(body)
            .query_async::<_, i64>(&mut connection)
            .await
            .map_err(|e| DomainError::internal(format!("event publish failed: {}", e)))?;

        tracing::debug!(routing_key = %key, "event published");
        Ok(())
    }
}

/// Consumer side: one dedicated pub/sub connection per binding.
pub struct RedisEventSubscriber {
    client: redis::Client,
}

impl RedisEventSubscriber {
    pub fn new(url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(url)
            .map_err(|e| DomainError::internal(format!("invalid redis url: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EventSubscriber for RedisEventSubscriber {
    async fn subscribe(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), DomainError> {
        let connection = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| DomainError::internal(format!("redis connect failed: {}", e)))?;
        let mut pubsub = connection.into_pubsub();
        pubsub
            .psubscribe(pattern)
            .await
            .map_err(|e| DomainError::internal(format!("psubscribe failed: {}", e)))?;
        tracing::info!(pattern, "consumer bound");

        let pattern = pattern.to_string();
        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            // One message is processed to completion before the next.
            while let Some(message) = stream.next().await {
                let channel = message.get_channel_name().to_string();
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(channel, error = %err, "unreadable message payload");
                        continue;
                    }
                };

                let envelope = match serde_json::from_str::<EventEnvelope>(&payload) {
                    Ok(envelope) => envelope.with_routing_key(channel.clone()),
                    Err(err) => {
                        tracing::warn!(channel, error = %err, "undecodable event envelope");
                        continue;
                    }
                };

                if let Err(err) = handler.handle(envelope).await {
                    // Pub/sub has no redelivery; surface loudly instead.
                    tracing::error!(
                        pattern = %pattern,
                        channel,
                        error = %err,
                        "event handler failed"
                    );
                }
            }
            tracing::warn!(pattern = %pattern, "consumer stream ended");
        });

        Ok(())
    }
}

/// Health indicator backed by a Redis PING.
pub struct RedisHealth {
    connection: MultiplexedConnection,
}

impl RedisHealth {
    pub fn new(bus: &RedisEventBus) -> Self {
        Self {
            connection: bus.connection.clone(),
        }
    }
}

#[async_trait]
impl crate::adapters::http::HealthIndicator for RedisHealth {
    async fn healthy(&self) -> bool {
        let mut connection = self.connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut connection)
            .await
            .is_ok()
    }
}
