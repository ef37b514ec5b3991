//! Event bus adapters: Redis pub/sub for deployment, in-memory for tests.

mod in_memory;
mod redis_bus;

pub use in_memory::InMemoryEventBus;
pub use redis_bus::{RedisEventBus, RedisEventSubscriber, RedisHealth};
