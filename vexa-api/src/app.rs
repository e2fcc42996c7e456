/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use vexa_api::{app::AppState, config::Config};
/// use vexa_shared::invites::{Invitations, MemoryInviteStore};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let invitations = Invitations::new(Arc::new(MemoryInviteStore::new()), config.invites.ttl_secs);
/// let state = AppState::new(pool, config, invitations);
/// let app = vexa_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use vexa_shared::auth::middleware::optional_jwt_auth_middleware;
use vexa_shared::invites::Invitations;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Pending team invitations
    pub invitations: Invitations,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, invitations: Invitations) -> Self {
        Self {
            db,
            config: Arc::new(config),
            invitations,
        }
    }

    /// Gets JWT secret for token verification
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health
/// ├── GET    /search?query=
/// ├── /projects
/// │   ├── GET, POST            /
/// │   ├── GET, PUT, DELETE     /:id
/// │   ├── POST                 /assign-team
/// │   └── GET                  /team/:team_id
/// ├── /tasks
/// │   ├── GET ?projectId=, POST /
/// │   ├── GET, PUT, DELETE     /:id
/// │   ├── PATCH                /:id/status
/// │   ├── PUT                  /:id/assign
/// │   ├── POST                 /:id/attachments
/// │   ├── GET                  /user/:user_id
/// │   └── GET                  /overdue
/// ├── /users
/// │   ├── GET, POST            /
/// │   └── GET                  /:external_id
/// └── /teams
///     ├── GET, POST            /
///     ├── GET, PUT, DELETE     /:id
///     ├── POST                 /:id/users
///     ├── GET                  /:id/members
///     ├── PATCH, DELETE        /:id/members/:user_id
///     ├── POST                 /:id/invitations
///     └── POST                 /invitations/:invite_id/accept
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security and no-cache headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Optional bearer authentication; handlers that need a caller use the
///    `CurrentUser` extractor
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/search", get(routes::search::search));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/assign-team", post(routes::projects::assign_team))
        .route("/team/:team_id", get(routes::projects::list_team_projects))
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/overdue", get(routes::tasks::list_overdue_tasks))
        .route("/user/:user_id", get(routes::tasks::list_user_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_task_status))
        .route("/:id/assign", put(routes::tasks::assign_task))
        .route("/:id/attachments", post(routes::tasks::add_attachment));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/:external_id", get(routes::users::get_user));

    let team_routes = Router::new()
        .route(
            "/",
            get(routes::teams::list_teams).post(routes::teams::create_team),
        )
        .route(
            "/invitations/:invite_id/accept",
            post(routes::invitations::accept_invitation),
        )
        .route(
            "/:id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/:id/users", post(routes::teams::add_team_users))
        .route("/:id/members", get(routes::teams::list_team_members))
        .route(
            "/:id/members/:user_id",
            patch(routes::teams::update_member_role).delete(routes::teams::remove_member),
        )
        .route(
            "/:id/invitations",
            post(routes::invitations::create_invitation),
        );

    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .nest("/teams", team_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            optional_auth_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Optional JWT authentication layer
///
/// Requests without an Authorization header pass through anonymously; a
/// malformed or invalid token is rejected with 401.
async fn optional_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    Ok(optional_jwt_auth_middleware(state.jwt_secret().to_string(), req, next).await?)
}
