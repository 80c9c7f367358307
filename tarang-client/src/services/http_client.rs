//! HTTP client for the audio platform API

use super::AudioService;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AudioAsset, CheckUserResponse, ClassifyResponse, CreateUserResponse, ProcessResponse,
    SelectedFile, UploadResponse, UserProfile,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tarang_common::config::ClientConfig;
use tarang_common::events::AssetSource;
use tarang_common::AssetId;

const USER_AGENT: &str = concat!("tarang/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`AudioService`]
#[derive(Debug, Clone)]
pub struct HttpAudioService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpAudioService {
    /// Create a client for the configured service
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn resource_url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Validation(format!("API URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Pull `error` / `details` out of a JSON error body, else use the raw text
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = value.get("error").and_then(|v| v.as_str());
        let details = value.get("details").and_then(|v| v.as_str());
        match (error, details) {
            (Some(e), Some(d)) => return format!("{}: {}", e, d),
            (Some(e), None) => return e.to_string(),
            _ => {}
        }
    }
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}

/// Map a 404 on an id-addressed resource to NotFoundAfterDelete
fn not_found_as_removed(err: ClientError, id: &AssetId) -> ClientError {
    match err {
        ClientError::Http { status: 404, .. } => ClientError::NotFoundAfterDelete(id.clone()),
        other => other,
    }
}

#[async_trait]
impl AudioService for HttpAudioService {
    async fn check_user(&self, user_id: &str) -> ClientResult<bool> {
        tracing::debug!(user = %user_id, "Checking user");
        let response = self
            .send(
                self.http_client
                    .post(self.url("check_user"))
                    .json(&json!({ "id": user_id })),
            )
            .await?;
        let body: CheckUserResponse = Self::json(response).await?;
        Ok(body.exists)
    }

    async fn create_user(&self, profile: &UserProfile) -> ClientResult<String> {
        tracing::debug!(user = %profile.id, "Creating user");
        let response = self
            .send(self.http_client.post(self.url("user")).json(profile))
            .await?;
        let body: CreateUserResponse = Self::json(response).await?;
        Ok(body.message.unwrap_or_default())
    }

    async fn upload(&self, user_id: &str, file: &SelectedFile) -> ClientResult<UploadResponse> {
        tracing::debug!(
            user = %user_id,
            file = %file.name,
            bytes = file.bytes.len(),
            "Uploading file"
        );

        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ClientError::Validation(format!("Bad content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .send(
                self.http_client
                    .post(self.resource_url(&["upload", user_id])?)
                    .multipart(form),
            )
            .await?;
        Self::json(response).await
    }

    async fn process_audio(&self, user_id: &str) -> ClientResult<ProcessResponse> {
        tracing::debug!(user = %user_id, "Requesting audio processing");
        let response = self
            .send(
                self.http_client
                    .post(self.resource_url(&["process-audio", user_id])?),
            )
            .await?;
        Self::json(response).await
    }

    async fn analyze_instruments(&self, user_id: &str) -> ClientResult<ClassifyResponse> {
        tracing::debug!(user = %user_id, "Requesting instrument classification");
        let response = self
            .send(
                self.http_client
                    .post(self.resource_url(&["analyze-instruments", user_id])?),
            )
            .await?;
        Self::json(response).await
    }

    async fn list_assets(
        &self,
        source: AssetSource,
        user_id: &str,
    ) -> ClientResult<Vec<AudioAsset>> {
        let url = self.url(source.collection_path());
        tracing::debug!(source = %source, user = %user_id, url = %url, "Listing assets");
        let response = self
            .send(self.http_client.get(&url).query(&[("userId", user_id)]))
            .await?;
        Self::json(response).await
    }

    async fn fetch_asset(&self, source: AssetSource, id: &AssetId) -> ClientResult<Bytes> {
        let url = self.resource_url(&[source.collection_path(), id.as_str()])?;
        tracing::debug!(asset_id = %id, url = %url, "Fetching audio payload");
        let response = self
            .send(self.http_client.get(url))
            .await
            .map_err(|e| not_found_as_removed(e, id))?;
        response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn delete_asset(&self, id: &AssetId, user_id: &str) -> ClientResult<()> {
        let url = self.resource_url(&[AssetSource::Generated.collection_path(), id.as_str()])?;
        tracing::debug!(asset_id = %id, user = %user_id, "Deleting asset");
        self.send(self.http_client.delete(url).query(&[("userId", user_id)]))
            .await
            .map_err(|e| not_found_as_removed(e, id))?;
        Ok(())
    }

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            self.url(path)
        }
    }
}
