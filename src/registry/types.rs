//! Core registry types shared by the catalog, client registry and evaluator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Pseudo-scope that requests a refresh token
pub const OFFLINE_ACCESS: &str = "offline_access";

/// OAuth 2.0 grant types a client may be allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    ClientCredentials,
    AuthorizationCode,
    Hybrid,
    ResourceOwnerPassword,
}

impl GrantType {
    /// Interactive grants go through the browser and need a redirect URI
    pub fn is_interactive(&self) -> bool {
        matches!(self, GrantType::AuthorizationCode | GrantType::Hybrid)
    }

    /// Whether an end user takes part in the grant
    pub fn has_end_user(&self) -> bool {
        !matches!(self, GrantType::ClientCredentials)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Hybrid => "hybrid",
            GrantType::ResourceOwnerPassword => "resource_owner_password",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "hybrid" => Ok(GrantType::Hybrid),
            "resource_owner_password" | "password" => Ok(GrantType::ResourceOwnerPassword),
            other => Err(format!("unknown grant type: {other}")),
        }
    }
}

/// Scope kinds: user identity claims or access to a protected API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Identity,
    Api,
}

/// Public-facing client fields for discovery and consent screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client_id: String,
    pub display_name: Option<String>,
    pub uri: Option<String>,
    pub front_channel_logout_uri: Option<String>,
}

/// OAuth error response body handed back to the endpoint layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    /// Error code
    pub error: String,
    /// Error description
    pub error_description: Option<String>,
}

/// Parse scope string into a set
pub fn parse_scope(scope: &str) -> BTreeSet<String> {
    scope.split_whitespace().map(|s| s.to_string()).collect()
}

/// Join scopes into a space-separated string
pub fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().cloned().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_parsing() {
        assert_eq!(
            "client_credentials".parse::<GrantType>(),
            Ok(GrantType::ClientCredentials)
        );
        assert_eq!(
            "password".parse::<GrantType>(),
            Ok(GrantType::ResourceOwnerPassword)
        );
        assert!("implicit".parse::<GrantType>().is_err());
        assert_eq!(GrantType::Hybrid.to_string(), "hybrid");
    }

    #[test]
    fn test_grant_type_serde() {
        let json = serde_json::to_string(&GrantType::ResourceOwnerPassword).unwrap();
        assert_eq!(json, "\"resource_owner_password\"");
        let parsed: GrantType = serde_json::from_str("\"authorization_code\"").unwrap();
        assert!(parsed.is_interactive());
        assert!(!GrantType::ClientCredentials.has_end_user());
    }

    #[test]
    fn test_scope_round_trip_is_sorted() {
        let scopes = parse_scope("profile  openid api1");
        assert_eq!(join_scopes(&scopes), "api1 openid profile");
        assert!(parse_scope("   ").is_empty());
    }
}
