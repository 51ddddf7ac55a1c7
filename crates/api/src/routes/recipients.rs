//! Recipient CRUD, listing and search routes.

use axum::extract::{Path, Query, State};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;

use pushgate_common::error::AppError;
use pushgate_common::types::Recipient;

use crate::routes::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/pusher/pushers/",
            axum::routing::get(list_recipients).post(create_recipient),
        )
        .route("/pusher/search/", axum::routing::get(search_recipients))
        .route(
            "/pusher/pushers/{pusher}/",
            axum::routing::get(get_recipient)
                .post(update_recipient)
                .delete(delete_recipient),
        )
}

/// Form fields for create/update. Everything optional; numeric fields are
/// parsed leniently (unparseable values behave as absent).
#[derive(Debug, Default, Deserialize)]
struct RecipientForm {
    #[serde(default)]
    pusher: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default, rename = "phoneNumber")]
    phone_number: Option<String>,
    #[serde(default, rename = "createdAt")]
    created_at: Option<String>,
}

impl RecipientForm {
    fn created_at(&self) -> Option<i64> {
        self.created_at.as_deref().and_then(|v| v.parse().ok())
    }
}

/// POST /pusher/pushers/ — create a recipient.
async fn create_recipient(
    State(state): State<AppState>,
    Form(form): Form<RecipientForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = form.pusher.clone().unwrap_or_default();
    if id.is_empty() {
        return Err(AppError::Validation("pusher is required.".to_string()));
    }

    let mut recipient = Recipient::new(id);
    recipient.email = form.email.clone().unwrap_or_default();
    recipient.nickname = form.nickname.clone().unwrap_or_default();
    recipient.phone_number = form.phone_number.clone().unwrap_or_default();
    recipient.created_at = form.created_at().unwrap_or(0);

    state.store.set(&recipient).await?;
    Ok(Json(json!({ "result": "OK" })))
}

/// GET /pusher/pushers/{pusher}/ — fetch one recipient.
async fn get_recipient(
    State(state): State<AppState>,
    Path(pusher): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let recipient = state
        .store
        .get(&pusher)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pusher {} not exists.", pusher)))?;
    Ok(Json(json!({ "pusher": recipient })))
}

/// POST /pusher/pushers/{pusher}/ — update non-empty fields of an existing
/// recipient.
async fn update_recipient(
    State(state): State<AppState>,
    Path(pusher): Path<String>,
    Form(form): Form<RecipientForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut recipient = state
        .store
        .get(&pusher)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pusher {} not exists.", pusher)))?;

    if let Some(email) = form.email.as_deref().filter(|v| !v.is_empty()) {
        recipient.email = email.to_string();
    }
    if let Some(nickname) = form.nickname.as_deref().filter(|v| !v.is_empty()) {
        recipient.nickname = nickname.to_string();
    }
    if let Some(phone) = form.phone_number.as_deref().filter(|v| !v.is_empty()) {
        recipient.phone_number = phone.to_string();
    }
    if let Some(created_at) = form.created_at() {
        recipient.created_at = created_at;
    }

    state.store.set(&recipient).await?;
    Ok(Json(json!({ "result": "OK" })))
}

/// DELETE /pusher/pushers/{pusher}/ — remove a recipient and its index
/// entries. Idempotent.
async fn delete_recipient(
    State(state): State<AppState>,
    Path(pusher): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.del(&pusher).await?;
    Ok(Json(json!({ "result": "OK" })))
}

/// GET /pusher/pushers/ — recency-ordered listing.
async fn list_recipients(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (from, size) = page.bounds();
    let (total, recipients) = state.store.get_all(from, size).await?;
    Ok(Json(json!({
        "pushers": recipients,
        "total": total,
        "from": from,
        "size": size,
    })))
}

/// GET /pusher/search/ — membership search.
async fn search_recipients(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let q = page
        .q()
        .ok_or_else(|| AppError::Validation("q is required.".to_string()))?;
    let (from, size) = page.bounds();
    let (total, recipients) = state.store.search(q, size, from).await?;
    Ok(Json(json!({
        "pushers": recipients,
        "total": total,
        "from": from,
        "size": size,
        "q": q,
    })))
}
