//! An in-memory [`Authenticator`]/[`User`] pair for the demo: tokens map
//! directly to users, scopes are checked against a per-user allow-list.

use std::collections::HashMap;

use async_trait::async_trait;
use marten_core::capability::{Authenticator, EngineError, User};

#[derive(Debug, Clone)]
pub struct DemoUser {
    pub identity: String,
    pub attributes: HashMap<String, String>,
    pub access_level: u32,
    pub allowed_scopes: Vec<String>,
}

impl User for DemoUser {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn attribute(&self, path: &str) -> Option<&str> {
        self.attributes.get(path).map(String::as_str)
    }

    fn access_level(&self) -> u32 {
        self.access_level
    }
}

#[derive(Default)]
pub struct DemoAuthenticator {
    tokens: HashMap<String, DemoUser>,
}

impl DemoAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user: DemoUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl Authenticator for DemoAuthenticator {
    type U = DemoUser;

    async fn authenticate(&self, token: &str) -> Result<Self::U, EngineError> {
        self.tokens.get(token).cloned().ok_or_else(|| EngineError::new("invalid token"))
    }

    async fn can_user_access_scope(&self, user: Option<&Self::U>, scope: &str) -> bool {
        match user {
            Some(u) => u.allowed_scopes.iter().any(|s| s == scope || s == "*"),
            None => scope == "public",
        }
    }
}
