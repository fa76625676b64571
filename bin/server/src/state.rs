//! Shared application state.

use crate::auth::token::TokenSigner;
use std::sync::Arc;
use storefront_assistant::Assistant;
use storefront_domain::{BillStore, CredentialHasher, ProductStore, UserStore};

/// State injected into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductStore>,
    pub bills: Arc<dyn BillStore>,
    pub users: Arc<dyn UserStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub signer: Arc<TokenSigner>,
    pub assistant: Arc<Assistant>,
}
