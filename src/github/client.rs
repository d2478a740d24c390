//! Per-request GitHub client bound to a session's access token

use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::models::{Branch, GithubUser, PullRequest, RepoInfo, Tree};
use crate::error::AppError;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Builds token-bound clients on top of one shared connection pool
///
/// Lives in `AppState`; the API base URL comes from configuration so tests
/// can point it at a mock server.
#[derive(Clone)]
pub struct GithubClientFactory {
    http: Client,
    api_base: Url,
}

impl GithubClientFactory {
    /// Create a factory for the given API base URL.
    ///
    /// # Errors
    /// Returns a configuration error when the base URL does not parse.
    pub fn new(http: Client, api_base: &str) -> Result<Self, AppError> {
        let api_base = Url::parse(api_base)
            .map_err(|error| AppError::Config(format!("invalid GitHub API base URL: {error}")))?;
        Ok(Self { http, api_base })
    }

    /// Construct a client for one request, bound to the session's token.
    pub fn for_token(&self, access_token: &str) -> GithubClient {
        GithubClient {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            token: access_token.to_owned(),
        }
    }
}

/// Parameters for creating a pull request upstream
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatePullRequestParams {
    pub title: String,
    pub head: String,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub draft: bool,
    pub maintainer_can_modify: bool,
}

/// Authenticated GitHub client for the duration of one request
pub struct GithubClient {
    http: Client,
    api_base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

impl GithubClient {
    /// GET /user
    pub async fn get_authenticated_user(&self) -> Result<GithubUser, AppError> {
        self.get_json("fetch user profile", &["user"], &[]).await
    }

    /// GET /user/repos, 100 most recently updated
    pub async fn list_repos(&self) -> Result<Vec<super::models::Repository>, AppError> {
        self.get_json(
            "fetch repositories",
            &["user", "repos"],
            &[("sort", "updated"), ("per_page", "100")],
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/pulls for one state
    pub async fn list_pulls(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        sort: &str,
        per_page: u8,
    ) -> Result<Vec<PullRequest>, AppError> {
        let per_page = per_page.to_string();
        self.get_json(
            "fetch pull requests",
            &["repos", owner, repo, "pulls"],
            &[
                ("state", state),
                ("sort", sort),
                ("direction", "desc"),
                ("per_page", &per_page),
            ],
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/pulls/{number}
    pub async fn get_pull(&self, owner: &str, repo: &str, number: u64) -> Result<Value, AppError> {
        let number = number.to_string();
        self.get_json(
            "fetch pull request",
            &["repos", owner, repo, "pulls", &number],
            &[],
        )
        .await
    }

    /// POST /repos/{owner}/{repo}/pulls
    pub async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        params: &CreatePullRequestParams,
    ) -> Result<Value, AppError> {
        self.post_json(
            "create pull request",
            &["repos", owner, repo, "pulls"],
            params,
        )
        .await
    }

    /// GET /repos/{owner}/{repo}
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<RepoInfo, AppError> {
        self.get_json("fetch repository", &["repos", owner, repo], &[])
            .await
    }

    /// GET /repos/{owner}/{repo}/branches
    pub async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, AppError> {
        self.get_json(
            "fetch branches",
            &["repos", owner, repo, "branches"],
            &[("per_page", "100")],
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/branches/{branch}
    pub async fn get_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Value, AppError> {
        self.get_json(
            "fetch branch",
            &["repos", owner, repo, "branches", branch],
            &[],
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/git/trees/HEAD
    pub async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        recursive: bool,
    ) -> Result<Tree, AppError> {
        let query: &[(&str, &str)] = if recursive {
            &[("recursive", "true")]
        } else {
            &[]
        };
        self.get_json(
            "fetch repository files",
            &["repos", owner, repo, "git", "trees", "HEAD"],
            query,
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/contents/{path}
    ///
    /// Upstream returns an object for a file and an array for a directory;
    /// both pass through untouched.
    pub async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Value, AppError> {
        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|part| !part.is_empty()));
        self.get_json("fetch repository contents", &segments, &[])
            .await
    }

    /// POST /repos/{owner}/{repo}/issues/{number}/comments
    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<Value, AppError> {
        let number = number.to_string();
        self.post_json(
            "add comment",
            &["repos", owner, repo, "issues", &number, "comments"],
            &serde_json::json!({ "body": body }),
        )
        .await
    }

    /// GET /repos/{owner}/{repo}/issues/{number}/comments
    pub async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<Value>, AppError> {
        let number = number.to_string();
        self.get_json(
            "fetch comments",
            &["repos", owner, repo, "issues", &number, "comments"],
            &[("per_page", "100")],
        )
        .await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| AppError::Config("GitHub API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        action: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .send()
            .await
            .map_err(|error| AppError::upstream(action, None, error.to_string()))?;

        Self::decode(action, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        action: &str,
        segments: &[&str],
        payload: &impl serde::Serialize,
    ) -> Result<T, AppError> {
        let url = self.endpoint(segments)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .json(payload)
            .send()
            .await
            .map_err(|error| AppError::upstream(action, None, error.to_string()))?;

        Self::decode(action, response).await
    }

    /// Map the upstream response to a value or a normalized error.
    async fn decode<T: DeserializeOwned>(
        action: &str,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|error| AppError::upstream(action, None, error.to_string()));
        }

        let message = response
            .json::<UpstreamErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown upstream error")
                    .to_owned()
            });

        Err(match status {
            StatusCode::FORBIDDEN => AppError::UpstreamPermission(message),
            StatusCode::NOT_FOUND => AppError::UpstreamNotFound(message),
            _ => AppError::upstream(action, Some(status.as_u16()), message),
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn test_client(server: &MockServer) -> GithubClient {
        let factory = GithubClientFactory::new(Client::new(), &server.uri())
            .expect("factory should build from mock URI");
        factory.for_token("gho_test_token")
    }

    #[tokio::test]
    async fn list_repos_sends_token_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("sort", "updated"))
            .and(query_param("per_page", "100"))
            .and(header("authorization", "Bearer gho_test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "name": "repo1",
                "fork": false,
                "private": false,
                "stargazers_count": 5,
                "forks_count": 2
            }])))
            .mount(&server)
            .await;

        let repos = test_client(&server)
            .await
            .list_repos()
            .await
            .expect("request should succeed");

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "repo1");
    }

    #[tokio::test]
    async fn forbidden_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/pulls"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "Resource not accessible by integration"
            })))
            .mount(&server)
            .await;

        let error = test_client(&server)
            .await
            .list_pulls("o", "r", "open", "created", 50)
            .await
            .expect_err("request should fail");

        assert!(
            matches!(error, AppError::UpstreamPermission(message)
                if message.contains("not accessible")),
        );
    }

    #[tokio::test]
    async fn not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/branches/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Branch not found"
            })))
            .mount(&server)
            .await;

        let error = test_client(&server)
            .await
            .get_branch("o", "r", "missing")
            .await
            .expect_err("request should fail");

        assert!(matches!(error, AppError::UpstreamNotFound(_)));
    }

    #[tokio::test]
    async fn other_statuses_forward_through_upstream_variant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/o/r/pulls"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed"
            })))
            .mount(&server)
            .await;

        let params = CreatePullRequestParams {
            title: "t".to_string(),
            head: "feature".to_string(),
            base: "main".to_string(),
            body: None,
            draft: false,
            maintainer_can_modify: true,
        };
        let error = test_client(&server)
            .await
            .create_pull("o", "r", &params)
            .await
            .expect_err("request should fail");

        assert!(matches!(
            error,
            AppError::Upstream {
                status: Some(422),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn tree_request_passes_recursive_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/HEAD"))
            .and(query_param("recursive", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [{ "path": "src/main.rs", "type": "blob" }]
            })))
            .mount(&server)
            .await;

        let tree = test_client(&server)
            .await
            .get_tree("o", "r", true)
            .await
            .expect("request should succeed");

        assert_eq!(tree.tree.len(), 1);
        assert_eq!(tree.tree[0].path, "src/main.rs");
    }

    #[tokio::test]
    async fn contents_path_components_become_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/src/main.rs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "main.rs",
                "type": "file"
            })))
            .mount(&server)
            .await;

        let contents = test_client(&server)
            .await
            .get_contents("o", "r", "src/main.rs")
            .await
            .expect("request should succeed");

        assert_eq!(contents["name"], "main.rs");
    }
}
