/// User endpoints
///
/// Users are keyed by the identity provider's subject (`externalId`); the
/// local `userId` is what teams and tasks reference.
///
/// # Endpoints
///
/// - `GET /users` - List users
/// - `POST /users` - Register a user
/// - `GET /users/:external_id` - Look up a user by identity subject

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DatastoreContext},
    extract::{AppJson, AppPath},
    response::Envelope,
};
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;
use vexa_shared::models::user::{CreateUser, User};

const USERNAME_MAX: usize = 50;

/// Register user request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "External ID is required"))]
    pub external_id: String,

    /// Defaults to the local part of `email`, cut to 50 characters
    #[validate(length(min = 2, max = 50, message = "Username must be 2-50 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(url(message = "Profile picture must be a valid URL"))]
    pub profile_picture_url: Option<String>,

    pub team_id: Option<i32>,
}

impl CreateUserRequest {
    /// Fills in the username from the email so validation covers it
    pub fn with_default_username(mut self) -> Self {
        if self.username.is_none() {
            self.username = Some(default_username(&self.email));
        }
        self
    }
}

fn default_username(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .take(USERNAME_MAX)
        .collect()
}

impl From<CreateUserRequest> for CreateUser {
    fn from(req: CreateUserRequest) -> Self {
        let username = req
            .username
            .unwrap_or_else(|| default_username(&req.email));

        CreateUser {
            external_id: req.external_id,
            username,
            email: req.email,
            profile_picture_url: req.profile_picture_url,
            team_id: req.team_id,
        }
    }
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Envelope<Vec<User>>> {
    let users = User::list(&state.db)
        .await
        .during("retrieving users")?;

    Ok(Envelope::ok(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    AppPath(external_id): AppPath<String>,
) -> ApiResult<Envelope<User>> {
    let user = User::find_by_external_id(&state.db, &external_id)
        .await
        .during("retrieving user")?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Envelope::ok(user))
}

/// Register user
///
/// ```text
/// POST /users
/// { "externalId": "user_2abc", "email": "ada@example.com" }
/// ```
///
/// A duplicate `externalId` or `email` is rejected with 409.
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> ApiResult<Envelope<User>> {
    let req = req.with_default_username();
    req.validate()?;

    let user = User::create(&state.db, req.into())
        .await
        .during("creating user")?;

    tracing::info!(user_id = user.user_id, "User registered");

    Ok(Envelope::created(user, "User Created Successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> CreateUserRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_username_defaults_to_email_local_part() {
        let req = request(serde_json::json!({
            "externalId": "user_1",
            "email": "ada.lovelace@example.com"
        }))
        .with_default_username();
        assert!(req.validate().is_ok());

        let create: CreateUser = req.into();
        assert_eq!(create.username, "ada.lovelace");
    }

    #[test]
    fn test_derived_username_is_cut_to_limit() {
        let local = "a".repeat(64);
        let req = request(serde_json::json!({
            "externalId": "user_1",
            "email": format!("{local}@example.com")
        }))
        .with_default_username();
        assert!(req.validate().is_ok());

        let create: CreateUser = req.into();
        assert_eq!(create.username.chars().count(), USERNAME_MAX);
    }

    #[test]
    fn test_short_derived_username_rejected() {
        let req = request(serde_json::json!({
            "externalId": "user_1",
            "email": "a@example.com"
        }))
        .with_default_username();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let req = request(serde_json::json!({
            "externalId": "user_1",
            "email": "not-an-email"
        }));

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_missing_email_fails_to_deserialize() {
        let result = serde_json::from_value::<CreateUserRequest>(serde_json::json!({
            "externalId": "user_1"
        }));
        assert!(result.is_err());
    }
}
