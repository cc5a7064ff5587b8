pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use services::{ApiClient, IdentityClient};
use std::sync::Arc;

/// Shared application state containing service clients
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<ApiClient>,
    pub identity: Arc<IdentityClient>,
}

impl AppState {
    pub fn new(api: Arc<ApiClient>, identity: Arc<IdentityClient>) -> Self {
        Self { api, identity }
    }
}
