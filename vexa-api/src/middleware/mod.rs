/// Middleware modules for the API server
///
/// Bearer authentication lives in `vexa_shared::auth::middleware` and is
/// wired up in `app`.

pub mod security;
