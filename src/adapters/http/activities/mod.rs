//! Activity & enrollment service HTTP surface.

mod dto;
mod handlers;
mod routes;

pub use handlers::ActivitiesAppState;
pub use routes::activities_router;
