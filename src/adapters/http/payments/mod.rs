//! Payment service HTTP surface, webhooks included.

mod dto;
mod handlers;
mod routes;

pub use handlers::PaymentsAppState;
pub use routes::payments_router;
