//! Client and scope registry with per-request authorization policy evaluation.

pub mod clients;
pub mod policy;
pub mod scopes;
pub mod secrets;
pub mod snapshot;
pub mod types;

// Re-export frequently used items from each module
pub use clients::{ClientRecord, ClientRegistry};
pub use policy::{Decision, DenialReason, PolicyEvaluator, RequestDescriptor};
pub use scopes::{ScopeCatalog, ScopeDefinition};
pub use secrets::{SecretDigest, verify, verify_at};
pub use snapshot::{Registry, SharedRegistry};
pub use types::{
    ClientSummary, GrantType, OAuthErrorResponse, OFFLINE_ACCESS, ScopeKind, join_scopes,
    parse_scope,
};
