//! User profile as supplied by the external identity provider

use serde::{Deserialize, Serialize};

/// Signed-in user profile
///
/// Serialized with the field names the profile store expects
/// (`{id, email, fullName}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            full_name: None,
        }
    }

    /// True if the profile carries a usable user id
    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// `POST /check_user` response
#[derive(Debug, Clone, Deserialize)]
pub struct CheckUserResponse {
    pub exists: bool,
}

/// `POST /user` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserResponse {
    #[serde(default)]
    pub message: Option<String>,
}
