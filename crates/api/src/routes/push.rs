//! Push acceptance routes: single push, broadcast, cancellation.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::json;

use pushgate_common::error::AppError;
use pushgate_dispatch::PushOutcome;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pusher/{sender}/push", post(push))
        .route("/pusher/{sender}/pushall", post(push_all))
        .route("/pusher/{sender}/cancelpush", post(cancel_push))
}

#[derive(Debug, Default, Deserialize)]
struct PushForm {
    #[serde(default)]
    pusher: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    schedat: Option<String>,
    #[serde(default)]
    force: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl PushForm {
    fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation(format!("{} is required.", field)))
    }

    fn sched_at(&self) -> Option<i64> {
        self.schedat.as_deref().and_then(|v| v.parse().ok())
    }

    fn force(&self) -> bool {
        matches!(
            self.force.as_deref(),
            Some("1" | "t" | "T" | "true" | "TRUE" | "True")
        )
    }
}

/// POST /pusher/{sender}/push — accept one delivery for one recipient.
/// Responds with the content-derived job name so the caller can cancel it
/// before delivery.
async fn push(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Form(form): Form<PushForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pusher = PushForm::required(form.pusher.as_deref(), "pusher")?;
    let data = PushForm::required(form.data.as_deref(), "data")?;

    let outcome = state
        .dispatcher
        .push(&sender, pusher, data, form.sched_at(), form.force())
        .await?;

    match outcome {
        PushOutcome::Submitted(name) => Ok(Json(json!({ "result": "OK", "name": name }))),
        PushOutcome::NotSubscribed => Err(AppError::Validation(format!(
            "pusher {} not has sender {}.",
            pusher, sender
        ))),
    }
}

/// POST /pusher/{sender}/pushall — accept a broadcast. Fan-out runs in the
/// worker; the response returns the control job's name.
async fn push_all(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Form(form): Form<PushForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let data = PushForm::required(form.data.as_deref(), "data")?;

    let name = state
        .dispatcher
        .push_all(&sender, data, form.tag.as_deref(), form.sched_at())
        .await?;

    Ok(Json(json!({ "result": "OK", "name": name })))
}

/// POST /pusher/{sender}/cancelpush — remove a not-yet-delivered job.
async fn cancel_push(
    State(state): State<AppState>,
    Path(sender): Path<String>,
    Form(form): Form<PushForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = PushForm::required(form.name.as_deref(), "name")?;
    state.dispatcher.cancel_push(&sender, name).await?;
    Ok(Json(json!({ "result": "OK" })))
}
