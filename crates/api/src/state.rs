//! Shared application state for the Axum API server.

use std::sync::Arc;

use pushgate_common::config::AppConfig;
use pushgate_dispatch::Dispatcher;
use pushgate_store::Storer;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storer>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Storer>, dispatcher: Arc<Dispatcher>, config: AppConfig) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }
}
