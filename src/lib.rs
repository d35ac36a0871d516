//! OpenID Connect client & resource registry.
//!
//! Loads scope definitions and client records into an immutable snapshot and
//! evaluates token and authorization requests against it: client lookup,
//! secret verification, grant types, PKCE, redirect URIs, CORS origins and
//! scopes.

pub mod config;
pub mod errors;
pub mod registry;
pub mod storage;
