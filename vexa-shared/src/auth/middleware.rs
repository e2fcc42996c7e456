/// Optional bearer-token authentication for Axum
///
/// Reads `Authorization: Bearer <token>`, verifies the token and stores an
/// [`AuthContext`] in the request extensions. Requests without the header pass
/// through unauthenticated; handlers that need a caller reject them
/// themselves. A header that is present but malformed or carries an invalid
/// token is rejected with 401.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware, Extension};
/// use vexa_shared::auth::middleware::{optional_jwt_auth_middleware, AuthContext};
///
/// async fn whoami(auth: Option<Extension<AuthContext>>) -> String {
///     auth.map(|Extension(ctx)| ctx.external_id).unwrap_or_default()
/// }
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes".to_string();
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(move |req, next| {
///         optional_jwt_auth_middleware(secret.clone(), req, next)
///     }));
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::jwt::{validate_token, JwtError};

/// Identity of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Identity provider subject (`users.external_id`)
    pub external_id: String,
}

/// Authentication failures
#[derive(Debug)]
pub enum AuthError {
    /// Authorization header is not a Bearer credential
    InvalidFormat(String),

    /// Token failed verification
    InvalidToken(String),
}

impl AuthError {
    pub fn message(&self) -> &str {
        match self {
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message() });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Verifies the bearer token in `headers`, if any
///
/// # Returns
///
/// - `Ok(None)` when no Authorization header is present
/// - `Ok(Some(ctx))` for a valid token
/// - `Err(_)` for a malformed header or invalid token
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Option<AuthContext>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Invalid Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    Ok(Some(AuthContext {
        external_id: claims.sub,
    }))
}

/// Middleware attaching an [`AuthContext`] when a valid token is presented
pub async fn optional_jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(context) = authenticate(req.headers(), &secret)? {
        tracing::debug!(external_id = %context.external_id, "Authenticated request");
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert_eq!(authenticate(&HeaderMap::new(), SECRET).unwrap(), None);
    }

    #[test]
    fn test_valid_bearer_token() {
        let token = create_token(&Claims::new("user_9"), SECRET).unwrap();
        let ctx = authenticate(&headers_with(&format!("Bearer {token}")), SECRET)
            .unwrap()
            .unwrap();
        assert_eq!(ctx.external_id, "user_9");
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let err = authenticate(&headers_with("Basic dXNlcjpwYXNz"), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));

        let err = authenticate(&headers_with("Bearer "), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let err = authenticate(&headers_with("Bearer abc.def.ghi"), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::InvalidToken("Token expired".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
