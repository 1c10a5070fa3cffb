use std::fmt;

use crate::error::{ClientError, ClientResult};

/// Access/refresh token pair. Contents are opaque to the client; only the
/// structure is checked, so a constructed value is always well-formed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access: String,
    refresh: String,
}

impl Credential {
    pub fn new<S: Into<String>>(access: S, refresh: S) -> ClientResult<Self> {
        let access = access.into();
        let refresh = refresh.into();
        if !is_token_shaped(&access) {
            return Err(ClientError::malformed("access token is empty or contains whitespace"));
        }
        if !is_token_shaped(&refresh) {
            return Err(ClientError::malformed("refresh token is empty or contains whitespace"));
        }
        Ok(Self { access, refresh })
    }

    pub fn access_token(&self) -> &str { &self.access }
    pub fn refresh_token(&self) -> &str { &self.refresh }

    pub fn bearer(&self) -> String { format!("Bearer {}", self.access) }
}

fn is_token_shaped(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}
