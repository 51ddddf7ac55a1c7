pub mod health;
pub mod push;
pub mod recipients;
pub mod senders;

use axum::Router;
use serde::Deserialize;

use crate::middleware::auth::require_signature;
use crate::state::AppState;

/// Default page size for listing endpoints.
const DEFAULT_PAGE_SIZE: usize = 10;

/// Hard cap on requested page sizes.
const MAX_PAGE_SIZE: usize = 100;

/// Common `from`/`size`/`q` query parameters, parsed leniently: anything
/// unparseable falls back to the default rather than failing the request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    q: Option<String>,
}

impl PageQuery {
    pub(crate) fn bounds(&self) -> (usize, usize) {
        let from = self
            .from
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let size = self
            .size
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        (from, size)
    }

    pub(crate) fn q(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }
}

/// Build the complete API router. The signed-request layer wraps every
/// `/pusher/` route when an app key is configured; the health probe stays
/// open either way.
pub fn create_router(state: AppState) -> Router {
    let mut protected = Router::new()
        .merge(recipients::router())
        .merge(senders::router())
        .merge(push::router());

    if state.config.auth_enabled() {
        protected = protected.layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_signature,
        ));
    }

    Router::new()
        .merge(health::router())
        .merge(protected)
        .with_state(state)
}
