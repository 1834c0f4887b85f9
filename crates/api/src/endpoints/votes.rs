//! Vote endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use serde::{Deserialize, Serialize};

use super::polls::ChoiceTallyResponse;
use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Cast vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub poll_id: String,
    /// Absent or empty means no selection was made.
    #[serde(default)]
    pub choice_id: Option<String>,
}

/// Cast vote response: the recorded vote and the updated tally.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteResponse {
    pub vote_id: String,
    pub poll_id: String,
    pub choice_id: String,
    pub results: Vec<ChoiceTallyResponse>,
}

/// Cast a vote. One per user per poll, while the poll is active.
async fn cast_vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<CastVoteResponse>> {
    let vote = state
        .vote_service
        .cast_vote(&user.id, &req.poll_id, req.choice_id.as_deref())
        .await?;

    let tally = state.vote_service.tally(&vote.poll_id).await?;

    Ok(ApiResponse::ok(CastVoteResponse {
        vote_id: vote.id,
        poll_id: vote.poll_id,
        choice_id: vote.choice_id,
        results: tally.into_iter().map(ChoiceTallyResponse::from).collect(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/create", post(cast_vote))
}
