//! Asset-related event payload types

use serde::{Deserialize, Serialize};

/// Where an asset listing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// Files the user uploaded (`/files`)
    Uploaded,
    /// Files generated server-side for the user (`/files-generated`)
    Generated,
}

impl AssetSource {
    /// Collection path segment on the remote service
    pub fn collection_path(&self) -> &'static str {
        match self {
            AssetSource::Uploaded => "files",
            AssetSource::Generated => "files-generated",
        }
    }
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSource::Uploaded => write!(f, "uploaded"),
            AssetSource::Generated => write!(f, "generated"),
        }
    }
}
