//! Projections of upstream GitHub objects
//!
//! Typed fields are the ones the proxy filters, sorts, or aggregates over.
//! Everything else the upstream sends is preserved verbatim through the
//! flattened map, so responses stay byte-compatible with the raw API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Repository as returned by `GET /user/repos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub fork: bool,
    pub private: bool,
    pub stargazers_count: u64,
    pub forks_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Authenticated user profile from `GET /user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pull request summary from `GET /repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Repository metadata from `GET /repos/{owner}/{repo}`
///
/// Only the default branch is projected; the branches endpoint merges it
/// with the branch list.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub default_branch: String,
}

/// Branch entry from `GET /repos/{owner}/{repo}/branches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

/// Git tree response from `GET /repos/{owner}/{repo}/git/trees/{ref}`
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub tree: Vec<TreeEntry>,
}

/// One entry of a git tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
