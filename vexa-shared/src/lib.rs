//! # VEXA Shared Library
//!
//! Types, data access and domain rules shared by the VEXA API server and the
//! typed client.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `auth`: token verification, auth context and the authorization policy
//! - `db`: connection pool and migrations
//! - `invites`: single-use, expiring team invitations

pub mod auth;
pub mod db;
pub mod invites;
pub mod models;

/// Current version of the VEXA shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
