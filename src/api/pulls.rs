//! Pull request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::Value;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::github::{CreatePullRequestParams, PullRequest};

/// Per-state page size when combining open and closed listings.
/// The merged list is truncated to `MAX_RESULTS`, so each side past 50 is
/// dropped; this matches the upstream paging the client compensates for.
const COMBINED_PAGE_SIZE: u8 = 50;
const MAX_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListPullsParams {
    pub state: Option<String>,
}

/// GET /api/repos/:owner/:repo/pulls?state=open|closed|all
///
/// `all` issues the open and closed listings concurrently, merges them, and
/// sorts descending by last update. The sort is stable, so equal timestamps
/// keep their upstream order.
pub async fn list_pulls(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<ListPullsParams>,
) -> Result<Json<Vec<PullRequest>>, AppError> {
    let github = state.github.for_token(&session.access_token);

    let state_filter = params.state.as_deref().unwrap_or("all");
    let pulls = match state_filter {
        "all" => {
            let (open, closed) = tokio::join!(
                github.list_pulls(&owner, &repo, "open", "created", COMBINED_PAGE_SIZE),
                github.list_pulls(&owner, &repo, "closed", "updated", COMBINED_PAGE_SIZE),
            );

            let mut pulls = open?;
            pulls.extend(closed?);
            pulls.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            pulls.truncate(MAX_RESULTS);
            pulls
        }
        "open" => {
            github
                .list_pulls(&owner, &repo, "open", "created", 100)
                .await?
        }
        "closed" => {
            github
                .list_pulls(&owner, &repo, "closed", "updated", 100)
                .await?
        }
        other => {
            return Err(AppError::validation(format!(
                "Invalid state filter: {other}"
            )));
        }
    };

    Ok(Json(pulls))
}

/// GET /api/repos/:owner/:repo/pulls/:number
pub async fn get_pull(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo, number)): Path<(String, String, u64)>,
) -> Result<Json<Value>, AppError> {
    let github = state.github.for_token(&session.access_token);
    let pull = github.get_pull(&owner, &repo, number).await?;
    Ok(Json(pull))
}

fn default_maintainer_can_modify() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePullRequestBody {
    pub title: Option<String>,
    pub head: Option<String>,
    pub base: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default = "default_maintainer_can_modify")]
    pub maintainer_can_modify: bool,
}

/// POST /api/repos/:owner/:repo/pulls
///
/// Validates the required fields locally, verifies both branches exist
/// upstream (concurrently; any lookup failure counts as "not found"), then
/// issues the create call. Bad input never reaches the create endpoint.
pub async fn create_pull(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo)): Path<(String, String)>,
    Json(request): Json<CreatePullRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let required = (
        non_empty(request.title),
        non_empty(request.head),
        non_empty(request.base),
    );
    let (Some(title), Some(head), Some(base)) = required else {
        return Err(AppError::validation(
            "Missing required fields: title, head, base",
        ));
    };

    let github = state.github.for_token(&session.access_token);

    let (base_lookup, head_lookup) = tokio::join!(
        github.get_branch(&owner, &repo, &base),
        github.get_branch(&owner, &repo, &head),
    );
    let (base_ok, head_ok) = (base_lookup.is_ok(), head_lookup.is_ok());

    if !base_ok || !head_ok {
        return Err(AppError::validation_with(
            "Invalid branch selection",
            branch_not_found_message(base_ok, head_ok, &owner, &repo),
        ));
    }

    if base == head {
        return Err(AppError::validation(
            "Base and head cannot be the same branch",
        ));
    }

    let params = CreatePullRequestParams {
        title,
        head,
        base,
        body: request.body,
        draft: request.draft,
        maintainer_can_modify: request.maintainer_can_modify,
    };
    let pull = github.create_pull(&owner, &repo, &params).await?;

    Ok((StatusCode::CREATED, Json(pull)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn branch_not_found_message(base_ok: bool, head_ok: bool, owner: &str, repo: &str) -> String {
    let side = match (base_ok, head_ok) {
        (false, false) => "Base and Head",
        (false, true) => "Base",
        _ => "Head",
    };
    format!("{side} branch not found in {owner}/{repo}")
}
