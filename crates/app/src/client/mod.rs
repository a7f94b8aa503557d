//! HTTP transport for the remote asset service
//!
//! [`HttpAssetService`] speaks the REST API of the asset store: JSON for
//! listings and pastes, multipart forms for creates, renames and uploads.
//! Every request carries a bearer token from the injected
//! [`CredentialProvider`].

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use common::prelude::{CredentialProvider, RemoteAssetService, RemoteError};
use common::remote::{
    AssetId, AssetRecord, Branch, CopyBranches, CreateOptions, ProjectId, ProjectRecord,
    RemoteTimestamp, RenameOptions, UserId, FOLDER_TYPE,
};

pub use error::ApiError;

/// Environment variable consulted before the configured token
pub const TOKEN_ENV_VAR: &str = "ASSETFS_TOKEN";

/// Upper bound the asset listing endpoint accepts per request
const ASSET_LIST_LIMIT: &str = "10000";

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasteRequest {
    project_id: ProjectId,
    assets: Vec<AssetId>,
    target_project_id: ProjectId,
    target_folder_id: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_branch_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpAssetService {
    remote: Url,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpAssetService {
    pub fn new(remote: &Url, credentials: Arc<dyn CredentialProvider>) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        // relative joins need the base to look like a directory
        let mut remote = remote.clone();
        if !remote.path().ends_with('/') {
            let path = format!("{}/", remote.path());
            remote.set_path(&path);
        }

        Ok(Self {
            remote,
            client,
            credentials,
        })
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.remote.join(path)?)
    }

    /// Authenticate and send a request, turning failure statuses into
    ///  service errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.send_for(request, None).await
    }

    async fn send_for(
        &self,
        request: RequestBuilder,
        upload: Option<AssetId>,
    ) -> Result<Response, RemoteError> {
        let token = self.credentials.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.map_err(ApiError::from)?;
        let error = error::classify(status, &body, upload);
        match &error {
            RemoteError::Unauthorized(_) => {
                tracing::warn!("access token rejected, forgetting it");
                self.credentials.invalidate();
            }
            RemoteError::StaleModification(_) => {}
            _ => tracing::error!(%status, body = %body, "asset api call failed"),
        }
        Err(error)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await.map_err(ApiError::from)?)
    }

    async fn list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, RemoteError> {
        let response: ListResponse<T> = self.json(request).await?;
        Ok(response.result)
    }
}

fn branch_query(branch_id: Option<&str>) -> Vec<(&'static str, String)> {
    branch_id
        .map(|id| vec![("branchId", id.to_string())])
        .unwrap_or_default()
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".js") || name.ends_with(".mjs") {
        "text/javascript"
    } else {
        "text/plain"
    }
}

#[async_trait]
impl RemoteAssetService for HttpAssetService {
    async fn fetch_user_id(&self) -> Result<UserId, RemoteError> {
        let request = self.client.get(self.url("id")?);
        let response: IdResponse = self.json(request).await?;
        Ok(response.id)
    }

    async fn list_projects(&self, user_id: UserId) -> Result<Vec<ProjectRecord>, RemoteError> {
        let request = self
            .client
            .get(self.url(&format!("users/{user_id}/projects"))?);
        let projects: Vec<ProjectRecord> = self.list(request).await?;
        tracing::debug!(count = projects.len(), "fetched projects");
        Ok(projects)
    }

    async fn list_branches(&self, project_id: ProjectId) -> Result<Vec<Branch>, RemoteError> {
        let request = self
            .client
            .get(self.url(&format!("projects/{project_id}/branches"))?);
        self.list(request).await
    }

    async fn list_assets(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
    ) -> Result<Vec<AssetRecord>, RemoteError> {
        let request = self
            .client
            .get(self.url(&format!("projects/{project_id}/assets"))?)
            .query(&[("view", "extension"), ("limit", ASSET_LIST_LIMIT)])
            .query(&branch_query(branch_id));
        self.list(request).await
    }

    async fn get_asset(
        &self,
        asset_id: AssetId,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError> {
        let request = self
            .client
            .get(self.url(&format!("assets/{asset_id}"))?)
            .query(&branch_query(branch_id));
        self.json(request).await
    }

    async fn get_file_content(
        &self,
        asset_id: AssetId,
        filename: &str,
        branch_id: Option<&str>,
    ) -> Result<Bytes, RemoteError> {
        let mut url = self.url(&format!("assets/{asset_id}/file/"))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.remote.to_string()))?
            .pop_if_empty()
            .push(filename);
        let request = self.client.get(url).query(&branch_query(branch_id));
        let response = self.send(request).await?;
        Ok(response.bytes().await.map_err(ApiError::from)?)
    }

    async fn create_asset(
        &self,
        project_id: ProjectId,
        name: &str,
        options: CreateOptions,
    ) -> Result<AssetRecord, RemoteError> {
        let mut form = multipart::Form::new();
        if options.kind.as_deref() != Some(FOLDER_TYPE) {
            let file = multipart::Part::bytes(Vec::new())
                .file_name(name.to_string())
                .mime_str(content_type_for(name))
                .map_err(ApiError::from)?;
            form = form.part("file", file);
        }
        form = form
            .text("preload", "false")
            .text("projectId", project_id.to_string())
            .text("name", name.to_string());
        if let Some(kind) = options.kind {
            form = form.text("type", kind);
        }
        if let Some(folder_id) = options.folder_id {
            form = form.text("parent", folder_id.to_string());
        }
        if let Some(branch_id) = options.branch_id {
            form = form.text("branchId", branch_id);
        }

        let request = self.client.post(self.url("assets/")?).multipart(form);
        self.json(request).await
    }

    async fn rename_asset(
        &self,
        asset_id: AssetId,
        new_name: &str,
        options: RenameOptions,
    ) -> Result<AssetRecord, RemoteError> {
        let parent = options
            .folder_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string());
        let mut form = multipart::Form::new()
            .text("name", new_name.to_string())
            .text("parent", parent);
        if let Some(branch_id) = options.branch_id {
            form = form.text("branchId", branch_id);
        }

        let request = self
            .client
            .put(self.url(&format!("assets/{asset_id}"))?)
            .multipart(form);
        let response = self.send_for(request, Some(asset_id)).await?;
        Ok(response.json::<AssetRecord>().await.map_err(ApiError::from)?)
    }

    async fn copy_asset(
        &self,
        source_project: ProjectId,
        asset_id: AssetId,
        target_project: ProjectId,
        folder_id: Option<AssetId>,
        branches: CopyBranches,
    ) -> Result<AssetRecord, RemoteError> {
        let body = PasteRequest {
            project_id: source_project,
            assets: vec![asset_id],
            target_project_id: target_project,
            target_folder_id: folder_id,
            branch_id: branches.source,
            target_branch_id: branches.target,
        };

        let request = self.client.post(self.url("assets/paste")?).json(&body);
        self.json(request).await
    }

    async fn delete_asset(&self, asset_id: AssetId, branch_id: Option<&str>) -> Result<(), RemoteError> {
        let request = self
            .client
            .delete(self.url(&format!("assets/{asset_id}"))?)
            .query(&branch_query(branch_id));
        self.send(request).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        asset_id: AssetId,
        filename: &str,
        last_modified: &RemoteTimestamp,
        data: Bytes,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError> {
        let file = multipart::Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str("text/plain")
            .map_err(ApiError::from)?;
        let mut form = multipart::Form::new()
            .part("file", file)
            .text("baseModificationTime", last_modified.as_str().to_string());
        if let Some(branch_id) = branch_id {
            form = form.text("branchId", branch_id.to_string());
        }

        let request = self
            .client
            .put(self.url(&format!("assets/{asset_id}"))?)
            .multipart(form);
        self.json(request).await
    }
}

/// Token from the environment, or else from the config file.
///
/// A token the remote rejects is forgotten for the rest of the process.
#[derive(Debug)]
pub struct ConfiguredCredentials {
    token: RwLock<Option<String>>,
}

impl ConfiguredCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|token| !token.is_empty())),
        }
    }

    /// Prefer `ASSETFS_TOKEN` over `configured`
    pub fn from_env_or(configured: Option<String>) -> Self {
        let from_env = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.is_empty());
        Self::new(from_env.or(configured))
    }
}

#[async_trait]
impl CredentialProvider for ConfiguredCredentials {
    async fn token(&self) -> Result<String, RemoteError> {
        self.token.read().clone().ok_or_else(|| {
            RemoteError::Unauthorized(format!(
                "no access token; set {TOKEN_ENV_VAR} or access_token in config.toml"
            ))
        })
    }

    fn invalidate(&self) {
        self.token.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(remote: &str) -> HttpAssetService {
        let credentials = Arc::new(ConfiguredCredentials::new(Some("token".to_string())));
        HttpAssetService::new(&Url::parse(remote).unwrap(), credentials).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let service = service("https://example.com/api");
        assert_eq!(service.base_url().as_str(), "https://example.com/api/");
        assert_eq!(
            service.url("projects/4/assets").unwrap().as_str(),
            "https://example.com/api/projects/4/assets"
        );
    }

    #[test]
    fn test_paste_request_shape() {
        let body = PasteRequest {
            project_id: 1,
            assets: vec![7],
            target_project_id: 2,
            target_folder_id: None,
            branch_id: Some("b1".to_string()),
            target_branch_id: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "projectId": 1,
                "assets": [7],
                "targetProjectId": 2,
                "targetFolderId": null,
                "branchId": "b1"
            })
        );
    }

    #[test]
    fn test_list_response_unwraps_result() {
        let json = r#"{"result":[{"id":"b-1","name":"main"}],"pagination":{}}"#;
        let response: ListResponse<Branch> = serde_json::from_str(json).unwrap();
        assert_eq!(response.result[0].name, "main");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let credentials = ConfiguredCredentials::new(Some(String::new()));
        assert!(matches!(
            credentials.token().await,
            Err(RemoteError::Unauthorized(_))
        ));

        let credentials = ConfiguredCredentials::new(Some("abc".to_string()));
        assert_eq!(credentials.token().await.unwrap(), "abc");
        credentials.invalidate();
        assert!(credentials.token().await.is_err());
    }

    #[test]
    fn test_scripts_upload_as_javascript() {
        assert_eq!(content_type_for("player.js"), "text/javascript");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
    }
}
