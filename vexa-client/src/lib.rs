//! # VEXA API Client
//!
//! Typed HTTP client for the VEXA API. Every backend endpoint is declared
//! once in [`endpoints`] as a [`QueryDef`] or [`MutationDef`]; the
//! [`VexaClient`] runs them, unwraps the `{ data, message }` envelope and
//! keeps query results in a [`QueryCache`] that mutations invalidate by tag.
//!
//! ```no_run
//! use vexa_client::{endpoints, StaticToken, VexaClient};
//!
//! # async fn example() -> Result<(), vexa_client::ClientError> {
//! let client = VexaClient::new("http://localhost:3000")?
//!     .with_token_provider(StaticToken::new("eyJhbGciOi..."));
//!
//! let projects = client.query(&endpoints::GET_PROJECTS, &()).await?;
//! // Served from the cache until a project mutation invalidates it
//! let again = client.query(&endpoints::GET_PROJECTS, &()).await?;
//! assert_eq!(projects, again);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod token;

pub use cache::{CacheKey, QueryCache, QueryStatus, Tag, TagKind};
pub use client::VexaClient;
pub use endpoints::{MutationDef, QueryDef};
pub use error::{ClientError, ClientResult};
pub use token::{StaticToken, TokenProvider};
