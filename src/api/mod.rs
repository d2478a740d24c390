//! API layer
//!
//! HTTP handlers proxying the dashboard's repository, pull-request, and
//! comment operations to the upstream API. Every route here sits behind the
//! authorization gate.

mod comments;
mod pulls;
mod repos;

use axum::{
    Router, middleware,
    routing::get,
};

use crate::AppState;
use crate::auth::require_auth;

/// Create the repository proxy router (nested under /api/repos)
pub fn repos_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(repos::list_repos))
        .route("/stats", get(repos::repo_stats))
        .route(
            "/:owner/:repo/pulls",
            get(pulls::list_pulls).post(pulls::create_pull),
        )
        .route("/:owner/:repo/pulls/:number", get(pulls::get_pull))
        .route(
            "/:owner/:repo/pulls/:number/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/:owner/:repo/branches", get(repos::list_branches))
        .route("/:owner/:repo/files", get(repos::file_tree))
        .route("/:owner/:repo/contents", get(repos::contents))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
