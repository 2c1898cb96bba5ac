//! Authentication seam.
//!
//! Admin routes only ever see the outcome of [`Authenticator::authenticate`].
//! The shipped implementation maps static bearer tokens, loaded from a JSON
//! file at startup, to users; a JWT-backed implementation can replace it
//! without touching the routes.

use crate::models::user::{AdminUser, AuthOutcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome;
}

/// One entry of the token file.
#[derive(Debug, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    #[serde(flatten)]
    pub user: AdminUser,
}

#[derive(Debug, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, AdminUser>,
}

impl StaticTokenAuthenticator {
    pub fn from_entries(entries: impl IntoIterator<Item = TokenEntry>) -> Self {
        Self {
            tokens: entries
                .into_iter()
                .filter(|entry| !entry.token.is_empty())
                .map(|entry| (entry.token, entry.user))
                .collect(),
        }
    }

    /// Load `[{"token": ..., "id": ..., "username": ..., "role": ..., "permissions": [...]}]`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading auth file {}", path.display()))?;
        let entries: Vec<TokenEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing auth file {}", path.display()))?;
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(token) = bearer_token(headers) else {
            return AuthOutcome::failure("MISSING_TOKEN", "Authentication required");
        };
        match self.tokens.get(token) {
            Some(user) => AuthOutcome::success(user.clone()),
            None => AuthOutcome::failure("INVALID_TOKEN", "Invalid or expired token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::io::Write;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn authenticator() -> StaticTokenAuthenticator {
        StaticTokenAuthenticator::from_entries([TokenEntry {
            token: "secret".into(),
            user: AdminUser {
                id: 7,
                username: "registrar".into(),
                role: "editor".into(),
                permissions: vec!["content:write".into()],
            },
        }])
    }

    #[tokio::test]
    async fn known_token_authenticates() {
        let outcome = authenticator().authenticate(&headers("Bearer secret")).await;
        assert!(outcome.authenticated);
        let user = outcome.user.unwrap();
        assert_eq!(user.username, "registrar");
        assert!(user.has_permission("content:write"));
        assert!(!user.has_permission("gallery:write"));
    }

    #[tokio::test]
    async fn missing_and_unknown_tokens_fail() {
        let auth = authenticator();
        let missing = auth.authenticate(&HeaderMap::new()).await;
        assert!(!missing.authenticated);
        assert_eq!(missing.error_code.as_deref(), Some("MISSING_TOKEN"));

        let unknown = auth.authenticate(&headers("Bearer nope")).await;
        assert_eq!(unknown.error_code.as_deref(), Some("INVALID_TOKEN"));

        let basic = auth.authenticate(&headers("Basic secret")).await;
        assert_eq!(basic.error_code.as_deref(), Some("MISSING_TOKEN"));
    }

    #[test]
    fn loads_token_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"token": "t1", "id": 1, "username": "head", "role": "admin"}}]"#
        )
        .unwrap();
        let auth = StaticTokenAuthenticator::from_file(file.path()).unwrap();
        assert_eq!(auth.len(), 1);
        assert!(auth.tokens["t1"].has_permission("anything:write"));
    }
}
