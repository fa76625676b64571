//! Domain model for the storefront platform.
//!
//! This crate provides:
//!
//! - **Entities**: products, bills and their line items, users and roles
//! - **Error taxonomy**: typed failures for every domain operation
//! - **Store contracts**: async traits the persistence layer implements
//! - **Memory store**: a single-lock in-memory implementation used by
//!   tests and as the reference for transactional semantics

pub mod bill;
pub mod error;
pub mod memory;
pub mod product;
pub mod report;
pub mod store;
pub mod user;

pub use bill::{Bill, BillItem, BillRequestLine, BillWithItems, format_bill_number};
pub use error::DomainError;
pub use memory::MemoryStore;
pub use product::{NewProduct, Product, ProductUpdate, resolve_by_name};
pub use report::{BillSummary, ProfitLossReport, SalesSummary};
pub use store::{BillStore, ProductStore, UserStore};
pub use user::{CredentialHasher, NewUser, Role, User};
