//! Remote audio service interface

use crate::error::ClientResult;
use crate::models::{
    AudioAsset, ClassifyResponse, ProcessResponse, SelectedFile, UploadResponse, UserProfile,
};
use async_trait::async_trait;
use bytes::Bytes;
use tarang_common::events::AssetSource;
use tarang_common::AssetId;

/// Operations exposed by the remote audio platform
///
/// Every identifier returned by an implementation is already canonical.
#[async_trait]
pub trait AudioService: Send + Sync {
    /// `POST /check_user` → whether the profile store knows this user
    async fn check_user(&self, user_id: &str) -> ClientResult<bool>;

    /// `POST /user` → server message
    async fn create_user(&self, profile: &UserProfile) -> ClientResult<String>;

    /// `POST /upload/{userId}` (multipart)
    async fn upload(&self, user_id: &str, file: &SelectedFile) -> ClientResult<UploadResponse>;

    /// `POST /process-audio/{userId}`: feature extraction on the latest upload
    async fn process_audio(&self, user_id: &str) -> ClientResult<ProcessResponse>;

    /// `POST /analyze-instruments/{userId}`: instrument / key / tempo
    async fn analyze_instruments(&self, user_id: &str) -> ClientResult<ClassifyResponse>;

    /// `GET /files` or `/files-generated` for one user
    async fn list_assets(&self, source: AssetSource, user_id: &str)
        -> ClientResult<Vec<AudioAsset>>;

    /// `GET /files/{id}` or `/files-generated/{id}`: binary payload
    async fn fetch_asset(&self, source: AssetSource, id: &AssetId) -> ClientResult<Bytes>;

    /// `DELETE /files-generated/{id}?userId=`
    async fn delete_asset(&self, id: &AssetId, user_id: &str) -> ClientResult<()>;

    /// Absolute URL for a server-relative artifact path
    fn resolve_url(&self, path: &str) -> String;
}
