//! Claims decoding for user-pool ID tokens.
//!
//! Tokens arrive directly from the token endpoint over TLS; signatures are
//! not verified here. The GraphQL endpoint verifies them on every request.

#[cfg(test)]
#[path = "jwt_test.rs"]
mod jwt_test;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use super::{IdentityError, User};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "cognito:username", default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub token_use: Option<String>,
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        let username = claims
            .username
            .or_else(|| claims.email.clone())
            .unwrap_or_else(|| claims.sub.clone());
        Self { username, sub: Some(claims.sub), email: claims.email }
    }
}

/// Decode the payload segment of a compact JWT.
///
/// # Errors
///
/// Returns [`IdentityError::InvalidToken`] if the token is not three
/// dot-separated segments or the payload is not base64url JSON claims.
pub fn decode_claims(token: &str) -> Result<Claims, IdentityError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(IdentityError::InvalidToken("expected three segments".to_owned()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| IdentityError::InvalidToken(e.to_string()))
}
