//! Poll endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::ChoiceTally;
use ballotbox_db::entities::poll;
use ballotbox_db::repositories::{PollFilter, PollPage, PollSort};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::ApiResponse,
};

/// Poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub text: String,
    pub owner_id: String,
    pub active: bool,
    pub created_at: String,
}

impl From<poll::Model> for PollResponse {
    fn from(model: poll::Model) -> Self {
        Self {
            id: model.id,
            text: model.text,
            owner_id: model.owner_id,
            active: model.active,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Per-choice tally response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceTallyResponse {
    pub id: String,
    pub text: String,
    pub votes: i64,
}

impl From<ChoiceTally> for ChoiceTallyResponse {
    fn from(tally: ChoiceTally) -> Self {
        Self {
            id: tally.choice_id,
            text: tally.text,
            votes: tally.votes,
        }
    }
}

/// One page of polls, echoing the filter so clients can build page links.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPageResponse {
    pub polls: Vec<PollResponse>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<PollSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl PollPageResponse {
    fn new(page: PollPage, sort: Option<PollSort>, search: Option<String>) -> Self {
        Self {
            polls: page.items.into_iter().map(PollResponse::from).collect(),
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
            sort,
            search,
        }
    }
}

/// List polls request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPollsRequest {
    #[serde(default)]
    pub sort: Option<PollSort>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
}

/// List all polls with optional search and sort.
async fn list_polls(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListPollsRequest>,
) -> AppResult<ApiResponse<PollPageResponse>> {
    let filter = PollFilter {
        sort: req.sort,
        search: req.search.clone(),
    };
    let page = state
        .poll_service
        .list_polls(&filter, req.page.unwrap_or(1))
        .await?;

    Ok(ApiResponse::ok(PollPageResponse::new(
        page, req.sort, req.search,
    )))
}

/// Own polls request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPollsRequest {
    #[serde(default)]
    pub page: Option<u64>,
}

/// List the caller's own polls.
async fn my_polls(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MyPollsRequest>,
) -> AppResult<ApiResponse<PollPageResponse>> {
    let page = state
        .poll_service
        .list_own_polls(&user.id, req.page.unwrap_or(1))
        .await?;

    Ok(ApiResponse::ok(PollPageResponse::new(page, None, None)))
}

/// Create poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub text: String,
    pub choice1: String,
    pub choice2: String,
}

/// Create a poll with its two initial choices.
async fn create_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let input = ballotbox_core::CreatePollInput {
        text: req.text,
        choice1: req.choice1,
        choice2: req.choice2,
    };

    let poll = state.poll_service.create_poll(&user, input).await?;

    Ok(ApiResponse::ok(poll.into()))
}

/// Show poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowPollRequest {
    pub poll_id: String,
}

/// Poll detail response: the poll, its tallied choices, and the caller's
/// voting status.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetailResponse {
    pub poll: PollResponse,
    pub choices: Vec<ChoiceTallyResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_choice_id: Option<String>,
    pub can_vote: bool,
}

/// Get poll details. Works anonymously; voting status needs a caller.
async fn show_poll(
    MaybeAuthUser(maybe_user): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowPollRequest>,
) -> AppResult<ApiResponse<PollDetailResponse>> {
    let poll = state.poll_service.get_poll(&req.poll_id).await?;
    let tally = state.vote_service.tally(&poll.id).await?;

    let (voted_choice_id, can_vote) = match maybe_user {
        Some(user) => {
            let vote = state.vote_service.vote_of_user(&user.id, &poll.id).await?;
            let can_vote = state.vote_service.can_vote(&user.id, &poll).await?;
            (vote.map(|v| v.choice_id), can_vote)
        }
        None => (None, false),
    };

    Ok(ApiResponse::ok(PollDetailResponse {
        poll: poll.into(),
        choices: tally.into_iter().map(ChoiceTallyResponse::from).collect(),
        voted_choice_id,
        can_vote,
    }))
}

/// Update poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    pub poll_id: String,
    pub text: String,
}

/// Update a poll's prompt text. Owner only.
async fn update_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let input = ballotbox_core::UpdatePollInput { text: req.text };
    let poll = state
        .poll_service
        .edit_poll(&req.poll_id, &user.id, input)
        .await?;

    Ok(ApiResponse::ok(poll.into()))
}

/// Delete poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePollRequest {
    pub poll_id: String,
}

/// Delete poll response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePollResponse {
    pub ok: bool,
}

/// Delete a poll and everything attached to it. Owner only.
async fn delete_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeletePollRequest>,
) -> AppResult<ApiResponse<DeletePollResponse>> {
    state.poll_service.delete_poll(&req.poll_id, &user.id).await?;

    Ok(ApiResponse::ok(DeletePollResponse { ok: true }))
}

/// Close poll request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePollRequest {
    pub poll_id: String,
}

/// Close a poll, ending voting. Owner only, idempotent.
async fn close_poll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ClosePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .vote_service
        .close_poll(&req.poll_id, &user.id)
        .await?;

    Ok(ApiResponse::ok(poll.into()))
}

/// Poll results request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsRequest {
    pub poll_id: String,
}

/// Poll results response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsResponse {
    pub poll: PollResponse,
    pub results: Vec<ChoiceTallyResponse>,
    pub total_votes: i64,
}

/// Get a poll's tallied results. Public.
async fn poll_results(
    State(state): State<AppState>,
    Json(req): Json<PollResultsRequest>,
) -> AppResult<ApiResponse<PollResultsResponse>> {
    let poll = state.poll_service.get_poll(&req.poll_id).await?;
    let tally = state.vote_service.tally(&poll.id).await?;

    let total_votes = tally.iter().map(|t| t.votes).sum();

    Ok(ApiResponse::ok(PollResultsResponse {
        poll: poll.into(),
        results: tally.into_iter().map(ChoiceTallyResponse::from).collect(),
        total_votes,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_polls))
        .route("/mine", post(my_polls))
        .route("/create", post(create_poll))
        .route("/show", post(show_poll))
        .route("/update", post(update_poll))
        .route("/delete", post(delete_poll))
        .route("/close", post(close_poll))
        .route("/results", post(poll_results))
}
