//! Per-user GPU workstation fleet: one principal instance plus up to three
//! accelerators, kept consistent with a deployment backend.
pub mod api;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;
