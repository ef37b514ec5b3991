//! Adapters - concrete implementations of the ports.

pub mod auth;
pub mod clients;
pub mod events;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod postgres;
