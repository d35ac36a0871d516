//! Standardized error types following the `error-registry-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when version information is not available
    #[error("error-registry-config-1 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when boolean string cannot be parsed
    #[error(
        "error-registry-config-2 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when a configured path is empty
    #[error("error-registry-config-3 {0} must not be empty")]
    EmptyPath(String),
}

/// Scope catalog errors raised while loading scope definitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeCatalogError {
    /// Two scope definitions share a name
    #[error("error-registry-scope-1 Duplicate scope: {0}")]
    DuplicateScope(String),

    /// A scope definition has an empty name
    #[error("error-registry-scope-2 Scope name must not be empty")]
    EmptyScopeName,
}

/// Client configuration errors raised while loading client records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientConfigError {
    /// A client record violates a registry invariant
    #[error("error-registry-client-1 Invalid client configuration for '{client_id}': {reason}")]
    InvalidClientConfig { client_id: String, reason: String },
}

impl ClientConfigError {
    pub(crate) fn invalid(client_id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidClientConfig {
            client_id: client_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Identifier of the client that failed validation
    pub fn client_id(&self) -> &str {
        match self {
            Self::InvalidClientConfig { client_id, .. } => client_id,
        }
    }
}

/// Secret digest errors raised while loading client secrets
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// Stored digest is not valid base64 or has the wrong length
    #[error("error-registry-secret-1 Malformed secret digest: {0}")]
    MalformedDigest(String),

    /// Secret value is empty
    #[error("error-registry-secret-2 Secret value must not be empty")]
    EmptySecret,
}

/// Errors that abort loading a registry snapshot
#[derive(Debug, Error)]
pub enum LoadError {
    /// Scope catalog could not be built
    #[error(transparent)]
    Scopes(#[from] ScopeCatalogError),

    /// Client registry could not be built
    #[error(transparent)]
    Clients(#[from] ClientConfigError),

    /// Registry source could not be read
    #[error("error-registry-load-1 Failed to read registry source {0}: {1}")]
    SourceUnavailable(String, String),

    /// Registry document could not be parsed
    #[error("error-registry-load-2 Failed to parse registry document: {0}")]
    ParseFailed(String),
}

/// Client lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No client is registered under the identifier
    #[error("error-registry-lookup-1 Client not found: {0}")]
    NotFound(String),
}

/// Internal faults that are never reported as policy denials
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The shared snapshot lock was poisoned by a panicking writer
    #[error("error-registry-internal-1 Registry snapshot lock poisoned: {0}")]
    LockPoisoned(String),

    /// A reload was rejected and the previous snapshot is still served
    #[error("error-registry-internal-2 Registry reload rejected: {0}")]
    ReloadRejected(#[from] LoadError),
}
