//! Repository endpoints

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::github::{Branch, Repository, TreeEntry};

/// GET /api/repos
///
/// The 100 most recently updated repositories of the authenticated user,
/// forks excluded.
pub async fn list_repos(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<Repository>>, AppError> {
    let github = state.github.for_token(&session.access_token);
    let repos = github.list_repos().await?;

    let sources: Vec<Repository> = repos.into_iter().filter(|repo| !repo.fork).collect();

    Ok(Json(sources))
}

/// Aggregated account statistics
///
/// There is no upstream aggregation endpoint; the sums are computed here
/// over the fetched repository list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    pub total_repos: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    pub followers: u64,
    pub following: u64,
    pub public_repos: usize,
    pub private_repos: usize,
}

/// GET /api/repos/stats
pub async fn repo_stats(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<RepoStats>, AppError> {
    let github = state.github.for_token(&session.access_token);

    let user = github.get_authenticated_user().await?;
    let repos = github.list_repos().await?;

    let stats = RepoStats {
        total_repos: repos.len(),
        total_stars: repos.iter().map(|repo| repo.stargazers_count).sum(),
        total_forks: repos.iter().map(|repo| repo.forks_count).sum(),
        followers: user.followers,
        following: user.following,
        public_repos: repos.iter().filter(|repo| !repo.private).count(),
        private_repos: repos.iter().filter(|repo| repo.private).count(),
    };

    Ok(Json(stats))
}

/// Merged branch listing for the PR creation form
#[derive(Debug, Serialize)]
pub struct BranchesResponse {
    pub default_branch: String,
    pub branches: Vec<Branch>,
}

/// GET /api/repos/:owner/:repo/branches
///
/// Repository metadata and the branch list touch disjoint upstream data, so
/// both are fetched concurrently and merged into one response.
pub async fn list_branches(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<BranchesResponse>, AppError> {
    let github = state.github.for_token(&session.access_token);

    let (repo_info, branches) = tokio::join!(
        github.get_repo(&owner, &repo),
        github.list_branches(&owner, &repo),
    );

    Ok(Json(BranchesResponse {
        default_branch: repo_info?.default_branch,
        branches: branches?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FileTreeParams {
    #[serde(default)]
    pub path: String,
    pub recursive: Option<String>,
}

/// GET /api/repos/:owner/:repo/files
///
/// Tree at HEAD, optionally recursive, optionally filtered by path prefix.
pub async fn file_tree(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<FileTreeParams>,
) -> Result<Json<Vec<TreeEntry>>, AppError> {
    let github = state.github.for_token(&session.access_token);

    let recursive = params.recursive.as_deref() == Some("true");
    let tree = github.get_tree(&owner, &repo, recursive).await?;

    let entries: Vec<TreeEntry> = if params.path.is_empty() {
        tree.tree
    } else {
        tree.tree
            .into_iter()
            .filter(|entry| entry.path.starts_with(&params.path))
            .collect()
    };

    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct ContentsParams {
    #[serde(default)]
    pub path: String,
}

/// GET /api/repos/:owner/:repo/contents
///
/// Pass-through: upstream returns an object for a file and an array for a
/// directory.
pub async fn contents(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<ContentsParams>,
) -> Result<Json<Value>, AppError> {
    let github = state.github.for_token(&session.access_token);
    let contents = github.get_contents(&owner, &repo, &params.path).await?;
    Ok(Json(contents))
}
