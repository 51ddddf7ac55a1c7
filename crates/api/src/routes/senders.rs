//! Sender subscription and tag management, plus the by-sender listing.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

use crate::routes::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pusher/{sender}/add", post(add_sender))
        .route("/pusher/{sender}/delete", post(remove_sender))
        .route("/pusher/{sender}/tag", post(add_tag))
        .route("/pusher/{sender}/untag", post(remove_tag))
        .route("/pusher/{sender}/pushers/", get(list_by_sender))
}

#[derive(Debug, Default, Deserialize)]
struct SubscribeForm {
    #[serde(default)]
    pusher: Option<String>,
    #[serde(default)]
    tag: Option<String>,
}

impl SubscribeForm {
    fn pusher(&self) -> Result<&str, AppError> {
        self.pusher
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("pusher is required.".to_string()))
    }

    fn tag(&self) -> Result<&str, AppError> {
        self.tag
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("tag is required.".to_string()))
    }
}

async fn load(state: &AppState, id: &str) -> Result<Recipient, AppError> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pusher {} not exists.", id)))
}

/// POST /pusher/{sender}/add — subscribe a recipient to a sender. A no-op
/// when already subscribed.
async fn add_sender(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut recipient = load(&state, form.pusher()?).await?;
    if recipient.add_sender(&sender) {
        state.store.set(&recipient).await?;
    }
    Ok(Json(json!({ "result": "OK" })))
}

/// POST /pusher/{sender}/delete — unsubscribe a recipient from a sender.
async fn remove_sender(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut recipient = load(&state, form.pusher()?).await?;
    if recipient.del_sender(&sender) {
        state.store.set(&recipient).await?;
    }
    Ok(Json(json!({ "result": "OK" })))
}

/// POST /pusher/{sender}/tag — attach a tag to a recipient.
async fn add_tag(
    State(state): State<AppState>,
    Path(_sender): Path<String>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tag = form.tag()?.to_string();
    let mut recipient = load(&state, form.pusher()?).await?;
    if recipient.add_tag(&tag) {
        state.store.set(&recipient).await?;
    }
    Ok(Json(json!({ "result": "OK" })))
}

/// POST /pusher/{sender}/untag — detach a tag from a recipient.
async fn remove_tag(
    State(state): State<AppState>,
    Path(_sender): Path<String>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tag = form.tag()?.to_string();
    let mut recipient = load(&state, form.pusher()?).await?;
    if recipient.del_tag(&tag) {
        state.store.set(&recipient).await?;
    }
    Ok(Json(json!({ "result": "OK" })))
}

/// GET /pusher/{sender}/pushers/ — recipients subscribed to a sender.
async fn list_by_sender(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (from, size) = page.bounds();
    let query = format!("senders:{}", sender);
    let (total, recipients) = state.store.search(&query, size, from).await?;
    Ok(Json(json!({
        "pushers": recipients,
        "total": total,
        "from": from,
        "size": size,
        "sender": sender,
    })))
}
