//! Bearer-token authentication.

use subtle::ConstantTimeEq;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid bearer token")]
    Invalid,
}

/// The token the server expects, resolved once at startup.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Returns `None` for a blank token; a server must not start without one.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Validates the value of an `Authorization` header.
    pub fn validate_header(&self, header: Option<&str>) -> Result<(), AuthError> {
        let provided = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Missing)?;

        if bool::from(provided.as_bytes().ct_eq(self.0.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(****)")
    }
}

/// Formats a token as an `Authorization` header value.
pub fn bearer_header(token: &str) -> String {
    format!("{}{}", BEARER_PREFIX, token)
}
