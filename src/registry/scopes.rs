//! Scope catalog holding identity resources and API scopes.

use crate::errors::ScopeCatalogError;
use crate::registry::types::ScopeKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named permission unit a client may request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    /// Unique scope name
    pub name: String,
    /// Identity or API scope
    pub kind: ScopeKind,
    /// Display name shown on consent screens
    pub display_name: String,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Claim types released when an identity scope is granted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_claims: Vec<String>,
    /// Whether the scope is advertised in the discovery document
    #[serde(default = "default_true")]
    pub show_in_discovery_document: bool,
}

fn default_true() -> bool {
    true
}

impl ScopeDefinition {
    pub fn identity(name: &str, display_name: &str, user_claims: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: ScopeKind::Identity,
            display_name: display_name.to_string(),
            description: None,
            user_claims: user_claims.iter().map(|c| c.to_string()).collect(),
            show_in_discovery_document: true,
        }
    }

    pub fn api(name: &str, display_name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ScopeKind::Api,
            display_name: display_name.to_string(),
            description: None,
            user_claims: Vec::new(),
            show_in_discovery_document: true,
        }
    }

    /// The standard `openid` identity scope
    pub fn openid() -> Self {
        Self::identity("openid", "Your user identifier", &["sub"])
    }

    /// The standard `profile` identity scope
    pub fn profile() -> Self {
        let mut scope = Self::identity(
            "profile",
            "User profile",
            &[
                "name",
                "family_name",
                "given_name",
                "middle_name",
                "nickname",
                "preferred_username",
                "profile",
                "picture",
                "website",
                "gender",
                "birthdate",
                "zoneinfo",
                "locale",
                "updated_at",
            ],
        );
        scope.description =
            Some("Your user profile information (first name, last name, etc.)".to_string());
        scope
    }
}

/// Read-only catalog of every scope the provider knows about
#[derive(Debug, Clone, Default)]
pub struct ScopeCatalog {
    scopes: BTreeMap<String, ScopeDefinition>,
}

impl ScopeCatalog {
    /// Build the catalog, rejecting duplicate scope names
    pub fn register(
        definitions: impl IntoIterator<Item = ScopeDefinition>,
    ) -> Result<Self, ScopeCatalogError> {
        let mut scopes = BTreeMap::new();
        for definition in definitions {
            if definition.name.trim().is_empty() {
                return Err(ScopeCatalogError::EmptyScopeName);
            }
            if scopes.contains_key(&definition.name) {
                return Err(ScopeCatalogError::DuplicateScope(definition.name));
            }
            scopes.insert(definition.name.clone(), definition);
        }
        Ok(Self { scopes })
    }

    pub fn is_known(&self, scope_name: &str) -> bool {
        self.scopes.contains_key(scope_name)
    }

    pub fn get(&self, scope_name: &str) -> Option<&ScopeDefinition> {
        self.scopes.get(scope_name)
    }

    pub fn kind_of(&self, scope_name: &str) -> Option<ScopeKind> {
        self.scopes.get(scope_name).map(|s| s.kind)
    }

    pub fn all_known_scope_names(&self) -> BTreeSet<String> {
        self.scopes.keys().cloned().collect()
    }

    /// Scope definitions in name order
    pub fn definitions(&self) -> impl Iterator<Item = &ScopeDefinition> {
        self.scopes.values()
    }

    /// Names advertised as `scopes_supported` in discovery
    pub fn discovery_scope_names(&self) -> BTreeSet<String> {
        self.scopes
            .values()
            .filter(|s| s.show_in_discovery_document)
            .map(|s| s.name.clone())
            .collect()
    }

    /// Union of the claims released by discoverable identity scopes
    pub fn supported_claims(&self) -> BTreeSet<String> {
        self.scopes
            .values()
            .filter(|s| s.kind == ScopeKind::Identity && s.show_in_discovery_document)
            .flat_map(|s| s.user_claims.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quickstart_catalog() -> ScopeCatalog {
        ScopeCatalog::register(vec![
            ScopeDefinition::openid(),
            ScopeDefinition::profile(),
            ScopeDefinition::api("api1", "My API #1"),
        ])
        .unwrap()
    }

    #[test]
    fn test_known_scopes() {
        let catalog = quickstart_catalog();
        assert!(catalog.is_known("openid"));
        assert!(catalog.is_known("api1"));
        assert!(!catalog.is_known("API1"));
        assert!(!catalog.is_known("offline_access"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.kind_of("api1"), Some(ScopeKind::Api));
        assert_eq!(catalog.kind_of("profile"), Some(ScopeKind::Identity));

        let names: Vec<String> = catalog.all_known_scope_names().into_iter().collect();
        assert_eq!(names, vec!["api1", "openid", "profile"]);
    }

    #[test]
    fn test_duplicate_scope_rejected() {
        let result = ScopeCatalog::register(vec![
            ScopeDefinition::api("api1", "My API #1"),
            ScopeDefinition::api("api1", "Another API"),
        ]);
        assert_eq!(
            result.unwrap_err(),
            ScopeCatalogError::DuplicateScope("api1".to_string())
        );
    }

    #[test]
    fn test_duplicate_across_kinds_rejected() {
        let result = ScopeCatalog::register(vec![
            ScopeDefinition::openid(),
            ScopeDefinition::api("openid", "Not an API"),
        ]);
        assert!(matches!(result, Err(ScopeCatalogError::DuplicateScope(name)) if name == "openid"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = ScopeCatalog::register(vec![ScopeDefinition::api(" ", "Blank")]);
        assert_eq!(result.unwrap_err(), ScopeCatalogError::EmptyScopeName);
    }

    #[test]
    fn test_discovery_metadata() {
        let mut hidden = ScopeDefinition::api("internal", "Internal API");
        hidden.show_in_discovery_document = false;

        let catalog = ScopeCatalog::register(vec![
            ScopeDefinition::openid(),
            ScopeDefinition::profile(),
            hidden,
        ])
        .unwrap();

        let discoverable = catalog.discovery_scope_names();
        assert!(discoverable.contains("openid"));
        assert!(!discoverable.contains("internal"));
        assert!(catalog.is_known("internal"));

        let claims = catalog.supported_claims();
        assert!(claims.contains("sub"));
        assert!(claims.contains("preferred_username"));
    }
}
