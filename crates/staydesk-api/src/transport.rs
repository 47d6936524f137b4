use async_trait::async_trait;
use serde_json::Value;

use crate::{request::ApiRequest, Result};

/// Anything that can execute an [`ApiRequest`] and hand back the JSON body
///
/// The HTTP client implements this; higher layers only ever see the trait,
/// which keeps them testable without a server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

/// Where the bearer token comes from
///
/// Implemented by the session context so the client never keeps its own
/// copy of the token.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Fixed token, handy for scripts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticToken(pub Option<String>);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
