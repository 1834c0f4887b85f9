//! Choice endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_db::entities::choice;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Choice response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceResponse {
    pub id: String,
    pub poll_id: String,
    pub text: String,
}

impl From<choice::Model> for ChoiceResponse {
    fn from(model: choice::Model) -> Self {
        Self {
            id: model.id,
            poll_id: model.poll_id,
            text: model.text,
        }
    }
}

/// Add choice request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChoiceRequest {
    pub poll_id: String,
    pub text: String,
}

/// Append a choice to a poll. Owner only.
async fn add_choice(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AddChoiceRequest>,
) -> AppResult<ApiResponse<ChoiceResponse>> {
    let choice = state
        .poll_service
        .add_choice(&req.poll_id, &user.id, req.text)
        .await?;

    Ok(ApiResponse::ok(choice.into()))
}

/// Update choice request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChoiceRequest {
    pub choice_id: String,
    pub text: String,
}

/// Update a choice's text. Poll owner only.
async fn update_choice(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateChoiceRequest>,
) -> AppResult<ApiResponse<ChoiceResponse>> {
    let choice = state
        .poll_service
        .edit_choice(&req.choice_id, &user.id, req.text)
        .await?;

    Ok(ApiResponse::ok(choice.into()))
}

/// Delete choice request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChoiceRequest {
    pub choice_id: String,
}

/// Delete choice response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChoiceResponse {
    pub ok: bool,
}

/// Delete a choice. Poll owner only; a poll keeps at least two choices.
async fn delete_choice(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteChoiceRequest>,
) -> AppResult<ApiResponse<DeleteChoiceResponse>> {
    state
        .poll_service
        .delete_choice(&req.choice_id, &user.id)
        .await?;

    Ok(ApiResponse::ok(DeleteChoiceResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(add_choice))
        .route("/update", post(update_choice))
        .route("/delete", post(delete_choice))
}
