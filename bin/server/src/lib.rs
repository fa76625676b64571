//! HTTP server for the storefront retail management system.
//!
//! The server wires the assistant engine, the Postgres stores, and the
//! REST surface together. Route-level authorization uses the extractors
//! in [`auth::middleware`]; tool-level authorization stays inside the
//! assistant's dispatcher.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
