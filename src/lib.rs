//! A web service scaffold with axum, MySQL and Redis.
//!
//! [`app::start`] connects the data stores and binds the listener,
//! and [`app::Running::run`] serves until the process is asked to stop.

pub mod api;
pub mod app;
pub mod infra;
