//! GitHub git-data object store
//!
//! Speaks the `/repos/{owner}/{repo}/git/*` REST endpoints: refs, commits,
//! trees and blobs.

use crate::error::FsError;
use crate::remote::store::{Commit, EncodedBlob, EntryKind, ObjectStore, RawTree, TreeEntry};
use crate::types::ObjectId;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

const GITHUB_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const GITHUB_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("roki/", env!("CARGO_PKG_VERSION"));

/// GitHub repository coordinates and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,

    /// Ref holding the wiki, e.g. `heads/master`
    #[serde(rename = "ref", default = "default_ref")]
    pub reference: String,

    /// Personal access token
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Maximum number of cached trees and blobs (unbounded when unset)
    #[serde(default)]
    pub cache_capacity: Option<usize>,

    /// Maximum number of in-flight requests (unbounded when unset)
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

fn default_ref() -> String {
    "heads/master".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl GithubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            reference: default_ref(),
            token: None,
            api_url: default_api_url(),
            cache_capacity: None,
            max_in_flight: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.owner.trim().is_empty() {
            return Err("owner cannot be empty".to_string());
        }
        if self.repo.trim().is_empty() {
            return Err("repo cannot be empty".to_string());
        }
        if self.reference.trim_start_matches("refs/").trim().is_empty() {
            return Err("ref cannot be empty".to_string());
        }
        if self.max_in_flight == Some(0) {
            return Err("max_in_flight must be at least 1".to_string());
        }
        Ok(())
    }
}

// Wire structures
#[derive(Deserialize)]
struct RefResponse {
    object: ShaObject,
}

#[derive(Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaObject,
    #[serde(default)]
    parents: Vec<ShaObject>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    sha: String,
    tree: Vec<WireTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Serialize, Deserialize)]
struct WireTreeEntry {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Serialize)]
struct CreateBlobRequest<'a> {
    content: String,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeRequest {
    tree: Vec<WireTreeEntry>,
}

#[derive(Serialize)]
struct CreateCommitRequest<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct UpdateRefRequest<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

fn map_http_error(error: reqwest::Error) -> FsError {
    if error.is_timeout() {
        FsError::Remote(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        FsError::Remote(format!("Connection error: {}", error))
    } else {
        FsError::Remote(format!("HTTP error: {}", error))
    }
}

fn short_ref(name: &str) -> &str {
    name.trim_start_matches("refs/")
}

/// Object store backed by a GitHub repository
pub struct GithubObjectStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GithubObjectStore {
    pub fn new(config: &GithubConfig) -> Result<Self, FsError> {
        config.validate().map_err(FsError::Configuration)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(GITHUB_HTTP_CONNECT_TIMEOUT)
            .timeout(GITHUB_HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FsError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/repos/{}/{}/git",
                config.api_url.trim_end_matches('/'),
                config.owner,
                config.repo
            ),
            token: config.token.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, FsError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(match status {
            StatusCode::NOT_FOUND => FsError::NotFound(what.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FsError::Configuration(format!(
                "Access to {} denied ({}): {}",
                what, status, error_text
            )),
            _ => FsError::Remote(format!(
                "Request for {} failed with status {}: {}",
                what, status, error_text
            )),
        })
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, FsError> {
        let response = self.send(request, what).await?;
        response
            .json()
            .await
            .map_err(|e| FsError::Remote(format!("Failed to parse response for {}: {}", what, e)))
    }
}

#[async_trait]
impl ObjectStore for GithubObjectStore {
    async fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, FsError> {
        let url = format!("{}/ref/{}", self.base_url, short_ref(name));
        // Bypass conditional caching so a fresh head is always observed.
        let request = self.client.get(&url).header("If-None-Match", "");
        match self.json::<RefResponse>(request, &format!("ref {}", name)).await {
            Ok(found) => Ok(Some(ObjectId::new(found.object.sha))),
            Err(FsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn read_commit(&self, id: &ObjectId) -> Result<Commit, FsError> {
        let url = format!("{}/commits/{}", self.base_url, id);
        let commit: CommitResponse = self
            .json(self.client.get(&url), &format!("commit {}", id))
            .await?;
        Ok(Commit {
            id: ObjectId::new(commit.sha),
            tree: ObjectId::new(commit.tree.sha),
            parents: commit
                .parents
                .into_iter()
                .map(|p| ObjectId::new(p.sha))
                .collect(),
            message: commit.message,
        })
    }

    async fn read_tree(&self, id: &ObjectId) -> Result<RawTree, FsError> {
        let url = format!("{}/trees/{}", self.base_url, id);
        let tree: TreeResponse = self
            .json(self.client.get(&url), &format!("tree {}", id))
            .await?;
        trace!(tree = %id, entries = tree.tree.len(), "Fetched tree");

        let mut entries = Vec::with_capacity(tree.tree.len());
        for entry in tree.tree {
            let kind = EntryKind::from_git_type(&entry.kind).ok_or_else(|| {
                FsError::Remote(format!(
                    "tree {} has entry {} of unknown type {}",
                    id, entry.path, entry.kind
                ))
            })?;
            entries.push(TreeEntry {
                name: entry.path,
                kind,
                mode: entry.mode,
                id: ObjectId::new(entry.sha),
            });
        }

        Ok(RawTree {
            id: ObjectId::new(tree.sha),
            entries,
            truncated: tree.truncated,
        })
    }

    async fn read_blob(&self, id: &ObjectId) -> Result<EncodedBlob, FsError> {
        let url = format!("{}/blobs/{}", self.base_url, id);
        let blob: BlobResponse = self
            .json(self.client.get(&url), &format!("blob {}", id))
            .await?;
        Ok(EncodedBlob {
            content: blob.content,
            encoding: blob.encoding,
        })
    }

    async fn create_blob(&self, content: &[u8]) -> Result<ObjectId, FsError> {
        let url = format!("{}/blobs", self.base_url);
        let request = CreateBlobRequest {
            content: base64::engine::general_purpose::STANDARD.encode(content),
            encoding: "base64",
        };
        let created: ShaObject = self
            .json(self.client.post(&url).json(&request), "new blob")
            .await?;
        debug!(blob = %created.sha, size = content.len(), "Created blob");
        Ok(ObjectId::new(created.sha))
    }

    async fn create_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, FsError> {
        let url = format!("{}/trees", self.base_url);
        let request = CreateTreeRequest {
            tree: entries
                .iter()
                .map(|entry| WireTreeEntry {
                    path: entry.name.clone(),
                    mode: entry.mode.clone(),
                    kind: entry.kind.git_type().to_string(),
                    sha: entry.id.to_string(),
                })
                .collect(),
        };
        let created: ShaObject = self
            .json(self.client.post(&url).json(&request), "new tree")
            .await?;
        debug!(tree = %created.sha, entries = entries.len(), "Created tree");
        Ok(ObjectId::new(created.sha))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, FsError> {
        let url = format!("{}/commits", self.base_url);
        let request = CreateCommitRequest {
            message,
            tree: tree.as_str(),
            parents: parents.iter().map(|p| p.as_str()).collect(),
        };
        let created: ShaObject = self
            .json(self.client.post(&url).json(&request), "new commit")
            .await?;
        debug!(commit = %created.sha, "Created commit");
        Ok(ObjectId::new(created.sha))
    }

    async fn update_ref(&self, name: &str, commit: &ObjectId, force: bool) -> Result<(), FsError> {
        let url = format!("{}/refs/{}", self.base_url, short_ref(name));
        let request = UpdateRefRequest {
            sha: commit.as_str(),
            force,
        };
        self.send(self.client.patch(&url).json(&request), &format!("ref {}", name))
            .await?;
        Ok(())
    }

    async fn create_ref(&self, name: &str, commit: &ObjectId) -> Result<(), FsError> {
        let url = format!("{}/refs", self.base_url);
        let request = CreateRefRequest {
            reference: format!("refs/{}", short_ref(name)),
            sha: commit.as_str(),
        };
        self.send(self.client.post(&url).json(&request), &format!("ref {}", name))
            .await?;
        Ok(())
    }

    fn store_name(&self) -> &str {
        "github"
    }
}
