/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `projects`, `tasks`, `users`, `teams`: entity CRUD
/// - `invitations`: team invitation issue and accept
/// - `search`: cross-entity text search

pub mod health;
pub mod invitations;
pub mod projects;
pub mod search;
pub mod tasks;
pub mod teams;
pub mod users;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use vexa_shared::auth::{authorization::Subject, middleware::AuthContext};

use crate::{
    app::AppState,
    error::{ApiError, DatastoreContext},
};

/// The authenticated local user making the request
///
/// Rejects with 401 before touching the database when the request carries
/// no token, and with 401 when the token's subject has no user row.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Subject);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<AuthContext>()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let subject = Subject::resolve(&state.db, auth)
            .await
            .during("resolving the current user")?
            .ok_or_else(|| {
                tracing::debug!(external_id = %auth.external_id, "Token subject has no user");
                ApiError::Unauthorized("User is not registered".to_string())
            })?;

        Ok(CurrentUser(subject))
    }
}
