use serde::Serialize;
use uuid::Uuid;

/// Session established with the external identity provider
///
/// Built per request from a validated provider token; never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub email: String,
    pub user_id: Uuid,
}

impl Session {
    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }
}
