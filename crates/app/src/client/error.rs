use common::prelude::RemoteError;
use common::remote::AssetId;
use reqwest::StatusCode;
use serde::Deserialize;

/// Message the remote puts in an upload rejection when the
///  `baseModificationTime` precondition fails
pub const ASSET_MODIFIED_MESSAGE: &str = "Asset was modified";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("remote URL cannot be a base: {0}")]
    InvalidBaseUrl(String),
}

/// Error body the asset API returns alongside a failing status
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ApiErrorResponse {
    /// Parse a failure body, falling back to the raw text
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            error: (!body.is_empty()).then(|| body.to_string()),
            ..Self::default()
        })
    }

    pub fn describe(&self) -> String {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .or(self.details.as_deref())
            .unwrap_or("apiCall failed")
            .to_string()
    }

    fn mentions(&self, needle: &str) -> bool {
        [&self.message, &self.error, &self.details]
            .into_iter()
            .flatten()
            .any(|text| text.contains(needle))
    }

    pub fn is_asset_modified(&self) -> bool {
        self.mentions(ASSET_MODIFIED_MESSAGE)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.mentions("Unauthorized")
    }
}

/// Map a failed response onto the service error kinds the filesystem
///  layer distinguishes. `upload` names the asset of a content upload,
///  the only request with a modification precondition.
pub fn classify(status: StatusCode, body: &str, upload: Option<AssetId>) -> RemoteError {
    let response = ApiErrorResponse::from_body(body);

    if let Some(asset_id) = upload.filter(|_| response.is_asset_modified()) {
        return RemoteError::StaleModification(asset_id);
    }
    if status == StatusCode::UNAUTHORIZED || response.is_unauthorized() {
        return RemoteError::Unauthorized(response.describe());
    }
    if status == StatusCode::NOT_FOUND {
        return RemoteError::NotFound(response.describe());
    }

    ApiError::HttpStatus(status, response.describe()).into()
}

impl From<ApiError> for RemoteError {
    fn from(e: ApiError) -> Self {
        RemoteError::Other(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_upload_is_recognised() {
        let body = r#"{"code":409,"message":"Asset was modified, please pull the latest version"}"#;
        assert!(matches!(
            classify(StatusCode::CONFLICT, body, Some(12)),
            RemoteError::StaleModification(12)
        ));
        // outside an upload the message is just a failure
        assert!(matches!(
            classify(StatusCode::CONFLICT, body, None),
            RemoteError::Other(_)
        ));
    }

    #[test]
    fn test_unauthorized_by_status_or_message() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "", None),
            RemoteError::Unauthorized(_)
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, r#"{"error":"Unauthorized"}"#, None),
            RemoteError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_other_failures_keep_status_and_text() {
        let error = classify(StatusCode::INTERNAL_SERVER_ERROR, "boom", None);
        match error {
            RemoteError::Other(e) => {
                let text = e.to_string();
                assert!(text.contains("500"));
                assert!(text.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, r#"{"error":"Asset not found"}"#, None),
            RemoteError::NotFound(msg) if msg == "Asset not found"
        ));
    }
}
