use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use sf_core::cancel::CancellationToken;
use sf_core::config::{RateLimitConfig as CoreRateLimitConfig, TrackerAuthMethod, TrackerConfig};
use sf_harness::rate_limiter::{RateLimitConfig as BucketConfig, RateLimiter};
use tracing::{debug, warn};

use crate::dto::{BoardDTO, FieldDTO, IssueDTO, ProjectDTO, SearchPage, SprintDTO, ValuesPage};
use crate::error::{ClientError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceType {
    Cloud,
    Server,
}

impl InstanceType {
    /// Cloud if the tracker host ends with the configured hosted-tenant
    /// suffix (default `.atlassian.net`); Server otherwise.
    fn detect(base_url: &str, cloud_suffix: &str) -> Self {
        let host = reqwest::Url::parse(base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        if host.ends_with(cloud_suffix) {
            InstanceType::Cloud
        } else {
            InstanceType::Server
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            InstanceType::Cloud => "3",
            InstanceType::Server => "2",
        }
    }
}

/// Which header(s) `request_with_retry` attaches per call, precomputed once
/// at construction so invalid credentials fail fast instead of on first use.
#[derive(Debug, Clone)]
enum AuthStrategy {
    Basic { username: String, secret: String },
    Bearer { token: String },
}

/// Authenticated, rate-limited, retry-aware HTTP access to one tracker
/// instance. One bucket per base URL, per §5's "owned resource" rule.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    instance_type: InstanceType,
    auth: AuthStrategy,
    rate_limiter: Arc<RateLimiter>,
    max_retries: u32,
    retry_base: Duration,
}

impl TrackerClient {
    pub fn new(tracker: &TrackerConfig, rate_limit: &CoreRateLimitConfig) -> Result<Self> {
        let cloud_suffix = tracker
            .cloud_hostname_suffix
            .clone()
            .unwrap_or_else(|| ".atlassian.net".to_string());
        let instance_type = InstanceType::detect(&tracker.base_url, &cloud_suffix);
        let auth = build_auth_strategy(tracker, instance_type)?;

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        let bucket_cfg =
            BucketConfig::from_window(rate_limit.calls_per_window, rate_limit.window_secs);

        Ok(Self {
            http,
            base_url: tracker.base_url.trim_end_matches('/').to_string(),
            instance_type,
            auth,
            rate_limiter: Arc::new(RateLimiter::new(bucket_cfg)),
            max_retries: rate_limit.max_retries,
            retry_base: Duration::from_secs(rate_limit.retry_base_secs),
        })
    }

    pub fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    pub async fn test_connection(&self, cancel: &CancellationToken) -> Result<bool> {
        match self.get_json("/rest/api/2/serverInfo", &[], cancel).await {
            Ok(_) => Ok(true),
            Err(ClientError::ClientError { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_sprints(
        &self,
        board_id: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SprintDTO>> {
        let board = board_id.ok_or_else(|| {
            ClientError::ClientError {
                status: 400,
                body: "board_id is required to list sprints".into(),
            }
        })?;
        let path = format!("/rest/agile/1.0/board/{board}/sprint");
        self.paginate_values(&path, &[], cancel).await
    }

    pub async fn get_sprint_issues(
        &self,
        sprint_id: i64,
        exclude_subtasks: bool,
        jql_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<IssueDTO>> {
        let path = format!("/rest/agile/1.0/sprint/{sprint_id}/issue");
        let mut query = Vec::new();
        let mut jql = String::new();
        if exclude_subtasks {
            jql.push_str("issuetype != Sub-task");
        }
        if let Some(extra) = jql_filter {
            if !jql.is_empty() {
                jql.push_str(" AND ");
            }
            jql.push_str(extra);
        }
        if !jql.is_empty() {
            query.push(("jql".to_string(), jql));
        }
        self.paginate_values(&path, &query, cancel).await
    }

    pub async fn get_boards(
        &self,
        project_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BoardDTO>> {
        let mut query = Vec::new();
        if let Some(key) = project_key {
            query.push(("projectKeyOrId".to_string(), key.to_string()));
        }
        self.paginate_values("/rest/agile/1.0/board", &query, cancel).await
    }

    pub async fn get_projects(&self, cancel: &CancellationToken) -> Result<Vec<ProjectDTO>> {
        let path = format!("/rest/api/{}/project", self.instance_type.api_version());
        let value = self.get_json(&path, &[], cancel).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_custom_fields(&self, cancel: &CancellationToken) -> Result<Vec<FieldDTO>> {
        let path = format!("/rest/api/{}/field", self.instance_type.api_version());
        let value = self.get_json(&path, &[], cancel).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn search_issues(
        &self,
        jql: &str,
        fields: &[&str],
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<IssueDTO>> {
        let path = format!("/rest/api/{}/search", self.instance_type.api_version());
        let fields_param = fields.join(",");
        let mut out = Vec::new();
        let mut start_at = 0i64;
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let remaining = max_results.saturating_sub(out.len());
            if remaining == 0 {
                break;
            }
            let page_size = remaining.min(100);
            let query = vec![
                ("jql".to_string(), jql.to_string()),
                ("fields".to_string(), fields_param.clone()),
                ("startAt".to_string(), start_at.to_string()),
                ("maxResults".to_string(), page_size.to_string()),
            ];
            let value = self.request_with_retry(Method::GET, &path, &query, cancel).await?;
            let page: SearchPage = serde_json::from_value(value)?;
            let got = page.issues.len() as i64;
            out.extend(page.issues);
            start_at += got;
            if got == 0 || start_at >= page.total {
                break;
            }
        }
        out.truncate(max_results);
        Ok(out)
    }

    pub async fn get_issue(
        &self,
        key: &str,
        fields: &[&str],
        cancel: &CancellationToken,
    ) -> Result<IssueDTO> {
        let path = format!(
            "/rest/api/{}/issue/{}",
            self.instance_type.api_version(),
            urlencoding::encode(key)
        );
        let query = if fields.is_empty() {
            vec![]
        } else {
            vec![("fields".to_string(), fields.join(","))]
        };
        let value = self.get_json(&path, &query, cancel).await?;
        Ok(serde_json::from_value(value)?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.request_with_retry(Method::GET, path, query, cancel).await
    }

    /// Follows `values`-style pagination (boards, sprints) until the server
    /// reports `isLast` or the page comes back short.
    async fn paginate_values<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        base_query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut start_at = 0i64;
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let mut query = base_query.to_vec();
            query.push(("startAt".to_string(), start_at.to_string()));
            query.push(("maxResults".to_string(), "50".to_string()));

            let value = self.request_with_retry(Method::GET, path, &query, cancel).await?;
            let page: ValuesPage<T> = serde_json::from_value(value)?;
            let got = page.values.len() as i64;
            let is_last = page.is_last.unwrap_or(got < page.max_results.max(1));
            out.extend(page.values);
            start_at += got;
            if is_last || got == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// One request through the rate limiter with retry/backoff, honoring
    /// `Retry-After` on 429 and failing fast on 401/403/other 4xx.
    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            if let Err(e) = self.rate_limiter.check(&self.base_url) {
                let retry_after = match &e {
                    sf_harness::rate_limiter::RateLimitError::Exceeded { retry_after, .. } => {
                        *retry_after
                    }
                };
                debug!(?retry_after, "tracker client rate limited locally, waiting");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .header("Accept", "application/json")
                .query(query);
            builder = match &self.auth {
                AuthStrategy::Basic { username, secret } => {
                    builder.basic_auth(username, Some(secret))
                }
                AuthStrategy::Bearer { token } => builder.bearer_auth(token),
            };
            let response = builder.send().await?;

            let status = response.status();

            if status.is_success() {
                return Ok(response.json::<Value>().await?);
            }

            match status {
                StatusCode::UNAUTHORIZED => {
                    return Err(ClientError::AuthFailure(format!(
                        "tracker rejected credentials for {url}"
                    )));
                }
                StatusCode::FORBIDDEN => {
                    return Err(ClientError::AuthzFailure(format!(
                        "tracker denied access to {url}"
                    )));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(1);
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(ClientError::RateLimit(format!(
                            "tracker 429 retries exhausted for {url}"
                        )));
                    }
                    warn!(retry_after, attempt, "tracker 429, honoring Retry-After");
                    tokio::time::sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                s if s.is_server_error() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(ClientError::ExternalService(format!(
                            "tracker {status} retries exhausted for {url}"
                        )));
                    }
                    let backoff = self.retry_base * 2u32.pow(attempt - 1);
                    warn!(%status, attempt, ?backoff, "tracker server error, retrying");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                s => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::ClientError {
                        status: s.as_u16(),
                        body,
                    });
                }
            }
        }
    }
}

fn build_auth_strategy(tracker: &TrackerConfig, instance_type: InstanceType) -> Result<AuthStrategy> {
    match tracker.auth_method {
        TrackerAuthMethod::Token => {
            let token = tracker.auth_token.clone().ok_or_else(|| {
                ClientError::AuthFailure("tracker auth_token is required for token auth".into())
            })?;
            match instance_type {
                InstanceType::Cloud => {
                    let username = tracker.username.clone().unwrap_or_default();
                    Ok(AuthStrategy::Basic { username, secret: token })
                }
                InstanceType::Server => Ok(AuthStrategy::Bearer { token }),
            }
        }
        TrackerAuthMethod::Basic => {
            let username = tracker.username.clone().ok_or_else(|| {
                ClientError::AuthFailure("username is required for basic auth".into())
            })?;
            let password = tracker.password.clone().ok_or_else(|| {
                ClientError::AuthFailure("password is required for basic auth".into())
            })?;
            Ok(AuthStrategy::Basic { username, secret: password })
        }
        TrackerAuthMethod::OAuth => {
            let oauth = tracker.oauth.as_ref().ok_or_else(|| {
                ClientError::AuthFailure("oauth config is required for oauth auth".into())
            })?;
            let token = tracker.auth_token.clone().ok_or_else(|| {
                ClientError::AuthFailure(format!(
                    "no access token available for oauth client {}",
                    oauth.client_id
                ))
            })?;
            Ok(AuthStrategy::Bearer { token })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloud_by_hostname_suffix() {
        assert_eq!(
            InstanceType::detect("https://myteam.atlassian.net", ".atlassian.net"),
            InstanceType::Cloud
        );
        assert_eq!(
            InstanceType::detect("https://jira.internal.example.com", ".atlassian.net"),
            InstanceType::Server
        );
    }

    #[test]
    fn api_version_follows_instance_type() {
        assert_eq!(InstanceType::Cloud.api_version(), "3");
        assert_eq!(InstanceType::Server.api_version(), "2");
    }

    #[test]
    fn token_auth_uses_basic_on_cloud_and_bearer_on_server() {
        let tracker = TrackerConfig {
            base_url: "https://myteam.atlassian.net".into(),
            auth_method: TrackerAuthMethod::Token,
            auth_token: Some("secret-token".into()),
            username: Some("user@example.com".into()),
            password: None,
            oauth: None,
            cloud_hostname_suffix: Some(".atlassian.net".into()),
        };
        let strategy = build_auth_strategy(&tracker, InstanceType::Cloud).unwrap();
        assert!(matches!(strategy, AuthStrategy::Basic { .. }));

        let strategy = build_auth_strategy(&tracker, InstanceType::Server).unwrap();
        assert!(matches!(strategy, AuthStrategy::Bearer { token } if token == "secret-token"));
    }
}
