//! Pull request comment endpoints
//!
//! PR conversation comments are issue comments upstream, so both operations
//! proxy to the issues API.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
    pub body: Option<String>,
}

/// POST /api/repos/:owner/:repo/pulls/:number/comments
///
/// Rejects empty or whitespace-only bodies before any upstream call; the
/// stored comment is the trimmed body.
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    Json(request): Json<CreateCommentBody>,
) -> Result<Json<Value>, AppError> {
    let Some(body) = request
        .body
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty())
    else {
        return Err(AppError::validation("Comment body is required"));
    };

    let github = state.github.for_token(&session.access_token);
    let comment = github
        .create_issue_comment(&owner, &repo, number, body)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Comment added successfully",
        "comment": {
            "id": comment["id"],
            "body": comment["body"],
            "user": comment["user"],
            "created_at": comment["created_at"],
        }
    })))
}

/// GET /api/repos/:owner/:repo/pulls/:number/comments
///
/// Direct pass-through, limited to 100 results upstream.
pub async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Result<Json<Vec<Value>>, AppError> {
    let github = state.github.for_token(&session.access_token);
    let comments = github.list_issue_comments(&owner, &repo, number).await?;
    Ok(Json(comments))
}
