//! Activity & enrollment route table.
//!
//! - `GET /actividades`, `GET /actividades/buscar`, `GET /actividades/:id` - open
//! - `POST /actividades`, `PUT/DELETE /actividades/:id` - admin
//! - `GET/POST/DELETE /inscripciones` - token

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{self, ActivitiesAppState};

pub fn activities_router(state: ActivitiesAppState, verifier: AuthState) -> Router {
    Router::new()
        .route(
            "/actividades",
            get(handlers::list_activities).post(handlers::create_activity),
        )
        .route("/actividades/buscar", get(handlers::search_activities))
        .route(
            "/actividades/:id",
            get(handlers::get_activity)
                .put(handlers::update_activity)
                .delete(handlers::delete_activity),
        )
        .route(
            "/inscripciones",
            get(handlers::list_enrollments)
                .post(handlers::enroll)
                .delete(handlers::unenroll),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
}
