//! Core identifier types for the storefront platform.
//!
//! This crate provides the strongly-typed identifiers shared by the
//! conversation, gateway, and assistant crates. Database-backed entities
//! (products, bills, users) use their storage-assigned integer keys and
//! live in `storefront-domain`.

pub mod id;

pub use id::{InvocationId, MessageId, ParseIdError};
