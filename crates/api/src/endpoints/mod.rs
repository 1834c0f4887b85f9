//! API endpoints.

mod auth;
mod choices;
mod polls;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/polls", polls::router())
        .nest("/choices", choices::router())
        .nest("/votes", votes::router())
}
