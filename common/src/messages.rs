// common/src/messages.rs
use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/send-code`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub email: String,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { success: true, message: None }
    }

    pub fn with_message(success: bool, message: impl Into<String>) -> Self {
        Self { success, message: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Body of `POST /api/proxy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRequest {
    #[serde(rename = "serverId", default)]
    pub server_id: Option<ServerSelection>,
}

/// A single server id takes the fast path, a list is fetched as a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerSelection {
    One(String),
    Many(Vec<String>),
}

/// Body of `GET /api/settings`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub title: String,
    pub server_ids: Vec<String>,
    pub no_need_login: bool,
}
