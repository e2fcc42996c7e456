/// Bearer token side channel
///
/// The client asks its provider for a token before every request. Having no
/// token is not an error: the request goes out unauthenticated and the
/// server decides.

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Option<String>;
}

/// Token held in memory, replaceable at runtime (e.g. after sign-in)
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Provider that never supplies a token
    pub fn none() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}
