use serde::{Deserialize, Serialize};

/// Stored when a login succeeds with `{"ok": true}` but no `access_token`.
pub const PLACEHOLDER_TOKEN: &str = "dummy";

/// Operator identity hint plus the opaque bearer credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub token: Option<String>,
}

impl Session {
    /// Authenticated means a token is present. Nothing else is consulted.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Authorization` header, if authenticated.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}
