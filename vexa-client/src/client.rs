/// HTTP client running the endpoint table
///
/// Every response is expected in the `{ data, message }` envelope used by
/// the API. Queries go through the [`QueryCache`]; mutations invalidate it.

use std::sync::Arc;

use reqwest::{RequestBuilder, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cache::{CacheKey, QueryCache, QueryStatus},
    endpoints::{MutationDef, QueryDef},
    error::{ClientError, ClientResult},
    token::{StaticToken, TokenProvider},
};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    message: Option<String>,
}

#[derive(Clone)]
pub struct VexaClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    cache: Arc<QueryCache>,
}

impl VexaClient {
    /// Creates a client without a token
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: Arc::new(StaticToken::none()),
            cache: Arc::new(QueryCache::new()),
        })
    }

    pub fn with_token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.tokens = Arc::new(provider);
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Cache status of a query for the given arguments
    pub async fn query_status<A: Serialize, T>(
        &self,
        def: &QueryDef<A, T>,
        args: &A,
    ) -> ClientResult<QueryStatus> {
        let key = CacheKey::new(def.name, args)?;
        Ok(self.cache.status(&key).await)
    }

    /// Runs a query, serving a fresh cached result when there is one
    pub async fn query<A, T>(&self, def: &QueryDef<A, T>, args: &A) -> ClientResult<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let key = CacheKey::new(def.name, args)?;

        if let Some(data) = self.cache.fresh(&key).await {
            tracing::trace!(key = %key, "Query served from cache");
            return Ok(serde_json::from_value(data)?);
        }

        self.cache.begin(&key).await;

        let fetched = async {
            let params = (def.params)(args);
            let mut request = self.http.get(self.url(&(def.path)(args)));
            if !params.is_empty() {
                request = request.query(&params);
            }

            let envelope = self.send(request).await?;
            let result: T = serde_json::from_value(envelope.data.clone())?;
            Ok::<_, ClientError>((envelope.data, result))
        }
        .await;

        match fetched {
            Ok((data, result)) => {
                let tags = (def.provides)(args, &result);
                let status = self.cache.succeed(&key, data, tags).await;
                tracing::debug!(key = %key, status = ?status, "Query fetched");
                Ok(result)
            }
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "Query failed");
                self.cache.fail(&key, err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Runs a mutation and invalidates the tags it declares
    ///
    /// Nothing is invalidated when the server rejects the mutation.
    pub async fn mutate<A, T>(&self, def: &MutationDef<A, T>, args: &A) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .request(def.method.clone(), self.url(&(def.path)(args)));
        if let Some(body) = (def.body)(args) {
            request = request.json(&body);
        }

        let envelope = self.send(request).await?;
        if let Some(message) = &envelope.message {
            tracing::info!(endpoint = def.name, message = %message, "Mutation succeeded");
        }

        let result: T = serde_json::from_value(envelope.data)?;

        let tags = (def.invalidates)(args, &result);
        let stale = self.cache.invalidate(&tags).await;
        tracing::debug!(endpoint = def.name, stale, "Cache invalidated");

        Ok(result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, mut request: RequestBuilder) -> ClientResult<Envelope> {
        if let Some(token) = self.tokens.token().await {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(Envelope {
                    data: Value::Null,
                    message: None,
                });
            }
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<Envelope>(&body)
            .ok()
            .and_then(|e| e.message)
            .or_else(|| (!body.trim().is_empty()).then(|| body.clone()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("An error occurred")
                    .to_string()
            });

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for VexaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VexaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_relative_base_url() {
        let err = VexaClient::new("/api").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = VexaClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/projects"), "http://localhost:3000/projects");
    }
}
