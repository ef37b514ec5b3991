//! Gym Platform - event-driven core services for a gym management system.
//!
//! Four cooperating services (identity, activities + enrollments,
//! plans + subscriptions, payments + gateways) share this crate and are
//! built as separate binaries under `src/bin/`.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
