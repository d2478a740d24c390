//! Authenticated client for the upstream GitHub REST API
//!
//! Exposes only the operations the proxy endpoints use. One client is built
//! per request, bound to that session's access token; the underlying
//! connection pool is shared through the factory.

mod client;
mod models;

pub use client::{CreatePullRequestParams, GithubClient, GithubClientFactory};
pub use models::{Branch, GithubUser, PullRequest, RepoInfo, Repository, Tree, TreeEntry};
