//! # SMM panel server
//! The HTTP surface of the panel core. It is responsible for:
//! * exposing order placement, deposits and account views to the dashboard,
//! * exposing the admin overrides and batch reconciliation runs,
//! * optionally running the reconciliation jobs on a timer.
//!
//! The server does not authenticate anyone itself. It sits behind the dashboard, which forwards the caller's identity
//! in the `smm_user_id` and `smm_role` headers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: User routes, acting on the caller's own wallet, orders and deposits.
//! * `/api/admin/...`: Admin-only routes.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
