//! GitHub contents API client implementation using reqwest.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{CommitterConfig, RemoteApiConfig, RepositoryConfig, StoreError};
use crate::ports::{
    ContentService, DeleteRequest, EntryKind, RemoteContent, RemoteEntry, RemoteObject,
    WriteRequest,
};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
const DEFAULT_STATUS_MESSAGE: &str = "GitHub API request failed";

/// HTTP transport for the repository contents API.
///
/// This client performs a single request per call. Retry behavior is implemented
/// by a dedicated retry wrapper adapter.
#[derive(Clone)]
pub struct HttpContentService {
    token: String,
    api_url: Url,
    owner: String,
    repo: String,
    branch: Option<String>,
    client: Client,
}

impl std::fmt::Debug for HttpContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContentService")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl HttpContentService {
    /// Create a new HTTP client for one repository.
    pub fn new(
        token: String,
        repository: &RepositoryConfig,
        api: &RemoteApiConfig,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .user_agent(concat!("repostore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::config_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token,
            api_url: api.api_url.clone(),
            owner: repository.owner.clone(),
            repo: repository.repo.clone(),
            branch: repository.branch.clone(),
            client,
        })
    }

    /// Create from the `GITHUB_TOKEN` environment variable.
    pub fn from_env(repository: &RepositoryConfig, api: &RemoteApiConfig) -> Result<Self, StoreError> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| StoreError::EnvironmentVariableMissing("GITHUB_TOKEN".into()))?;

        Self::new(token, repository, api)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.api_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StoreError::config_error(format!("API URL cannot be a base: {}", self.api_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let mut segments = vec!["repos", self.owner.as_str(), self.repo.as_str(), "contents"];
        segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        self.endpoint(&segments)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    fn send(&self, builder: RequestBuilder, context: &RequestContext<'_>) -> Result<Response, StoreError> {
        let response = self.authorized(builder).send().map_err(|e| {
            if e.is_builder() {
                StoreError::config_error(format!("Invalid request: {}", e))
            } else {
                StoreError::Transient {
                    message: format!("HTTP request failed: {}", e),
                    status: None,
                    retry_after_ms: None,
                }
            }
        })?;

        let status = response.status();
        tracing::debug!(method = context.method, path = context.path, status = status.as_u16(), "contents API call");

        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body_text = response.text().unwrap_or_default();
        Err(classify_failure(status, &headers, &body_text, context))
    }
}

struct RequestContext<'a> {
    method: &'static str,
    path: &'a str,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl ApiEntry {
    fn into_remote_entry(self) -> RemoteEntry {
        RemoteEntry {
            kind: self.kind.as_deref().and_then(EntryKind::parse),
            name: self.name,
            path: self.path,
            sha: self.sha,
            size: self.size,
            download_url: self.download_url.as_deref().and_then(|raw| Url::parse(raw).ok()),
        }
    }

    fn into_remote_object(mut self) -> Result<RemoteObject, StoreError> {
        let content = match (self.content.take(), self.encoding.as_deref()) {
            (Some(encoded), Some("base64")) => Some(decode_base64(&encoded)?),
            (Some(raw), None) if !raw.is_empty() => Some(raw.into_bytes()),
            _ => None,
        };
        Ok(RemoteObject { entry: self.into_remote_entry(), content })
    }
}

#[derive(Debug, Deserialize)]
struct ApiWriteResponse {
    content: Option<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Serialize)]
struct ApiCommitter<'a> {
    name: &'a str,
    email: &'a str,
}

impl<'a> From<&'a CommitterConfig> for ApiCommitter<'a> {
    fn from(committer: &'a CommitterConfig) -> Self {
        Self { name: &committer.name, email: &committer.email }
    }
}

#[derive(Debug, Serialize)]
struct ApiWriteRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    committer: ApiCommitter<'a>,
}

#[derive(Debug, Serialize)]
struct ApiDeleteRequest<'a> {
    message: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    committer: ApiCommitter<'a>,
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::malformed("object content", format!("invalid base64: {}", e)))
}

fn parse_json<T: for<'de> Deserialize<'de>>(body: &str, what: &str) -> Result<T, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::malformed(what, e.to_string()))
}

fn parse_contents(body: &str) -> Result<RemoteContent, StoreError> {
    let value: serde_json::Value = parse_json(body, "contents response")?;
    if value.is_array() {
        let entries: Vec<ApiEntry> = serde_json::from_value(value)
            .map_err(|e| StoreError::malformed("contents listing", e.to_string()))?;
        return Ok(RemoteContent::Listing(
            entries.into_iter().map(ApiEntry::into_remote_entry).collect(),
        ));
    }

    let entry: ApiEntry = serde_json::from_value(value)
        .map_err(|e| StoreError::malformed("contents object", e.to_string()))?;
    Ok(RemoteContent::Object(entry.into_remote_object()?))
}

fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    context: &RequestContext<'_>,
) -> StoreError {
    // Non-JSON bodies (proxy error pages and the like) stay out of the message.
    let message = extract_error_message(body).unwrap_or_else(|| {
        if status.as_u16() == 429 {
            "Rate limited".to_string()
        } else if status.is_server_error() {
            "Server error".to_string()
        } else {
            DEFAULT_STATUS_MESSAGE.to_string()
        }
    });
    let lower = message.to_ascii_lowercase();
    let path = context.path.to_string();
    let too_large = || StoreError::TooLarge {
        path: path.clone(),
        size: context.size.unwrap_or_default(),
        limit: None,
    };

    match status.as_u16() {
        404 => StoreError::NotFound { path },
        409 => StoreError::Conflict { path, message },
        413 => too_large(),
        422 if lower.contains("sha") => StoreError::Conflict { path, message },
        422 if lower.contains("too large") || lower.contains("too big") => too_large(),
        401 => StoreError::Unauthorized(message),
        403 if is_rate_limited(headers, &lower) => StoreError::Transient {
            message,
            status: Some(403),
            retry_after_ms: retry_after_ms(headers),
        },
        403 => StoreError::Unauthorized(message),
        408 | 429 => StoreError::Transient {
            message,
            status: Some(status.as_u16()),
            retry_after_ms: retry_after_ms(headers),
        },
        code if status.is_server_error() => {
            StoreError::Transient { message, status: Some(code), retry_after_ms: retry_after_ms(headers) }
        }
        code => StoreError::Rejected { status: code, message },
    }
}

fn is_rate_limited(headers: &HeaderMap, lower_message: &str) -> bool {
    let exhausted = headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    exhausted || lower_message.contains("rate limit")
}

fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(msg) = parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
    {
        return Some(msg.to_string());
    }

    parsed.get("message").and_then(|message| message.as_str()).map(ToOwned::to_owned)
}

fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    if let Some(value) = headers.get(RETRY_AFTER).and_then(parse_seconds) {
        return Some(value.saturating_mul(1000));
    }

    let reset_epoch = headers.get(RATE_LIMIT_RESET).and_then(parse_seconds)?;
    let now = u64::try_from(Utc::now().timestamp()).ok()?;
    Some(reset_epoch.saturating_sub(now).saturating_mul(1000))
}

fn parse_seconds(value: &HeaderValue) -> Option<u64> {
    value.to_str().ok()?.trim().parse::<u64>().ok()
}

impl ContentService for HttpContentService {
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError> {
        let mut url = self.contents_url(path)?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let context = RequestContext { method: "GET", path, size: None };
        let response = self.send(self.client.get(url), &context)?;
        let body = response
            .text()
            .map_err(|e| StoreError::malformed("contents response", e.to_string()))?;
        parse_contents(&body)
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        let url = self.contents_url(request.path)?;
        let body = ApiWriteRequest {
            message: request.message,
            content: STANDARD.encode(request.content),
            sha: request.expected_sha,
            branch: self.branch.as_deref(),
            committer: request.committer.into(),
        };

        let context =
            RequestContext { method: "PUT", path: request.path, size: Some(request.content.len() as u64) };
        let response = self.send(self.client.put(url).json(&body), &context)?;
        let text = response
            .text()
            .map_err(|e| StoreError::malformed("write response", e.to_string()))?;
        let parsed: ApiWriteResponse = parse_json(&text, "write response")?;

        parsed
            .content
            .map(ApiEntry::into_remote_entry)
            .ok_or_else(|| StoreError::malformed("write response", "missing 'content' object"))
    }

    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError> {
        let url = self.contents_url(request.path)?;
        let body = ApiDeleteRequest {
            message: request.message,
            sha: request.expected_sha,
            branch: self.branch.as_deref(),
            committer: request.committer.into(),
        };

        let context = RequestContext { method: "DELETE", path: request.path, size: None };
        self.send(self.client.delete(url).json(&body), &context)?;
        Ok(())
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        let url = self.endpoint(&["user"])?;
        let context = RequestContext { method: "GET", path: "user", size: None };
        let response = self.send(self.client.get(url), &context)?;
        let text = response.text().map_err(|e| StoreError::malformed("user response", e.to_string()))?;
        let user: ApiUser = parse_json(&text, "user response")?;
        Ok(user.login)
    }
}
