//! Serialized registry document and its conversion into registry types.

use crate::errors::{ClientConfigError, LoadError};
use crate::registry::clients::ClientRecord;
use crate::registry::scopes::ScopeDefinition;
use crate::registry::secrets::SecretDigest;
use crate::registry::types::{GrantType, ScopeKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Scopes and clients as supplied by configuration or storage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryDocument {
    #[serde(default)]
    pub identity_resources: Vec<ScopeDocument>,
    #[serde(default)]
    pub api_resources: Vec<ScopeDocument>,
    #[serde(default)]
    pub clients: Vec<ClientDocument>,
}

impl RegistryDocument {
    pub fn from_json(value: &str) -> Result<Self, LoadError> {
        serde_json::from_str(value).map_err(|e| LoadError::ParseFailed(e.to_string()))
    }

    /// Identity resources first, then API scopes, in document order
    pub fn scope_definitions(&self) -> Vec<ScopeDefinition> {
        self.identity_resources
            .iter()
            .map(|scope| scope.to_definition(ScopeKind::Identity))
            .chain(
                self.api_resources
                    .iter()
                    .map(|scope| scope.to_definition(ScopeKind::Api)),
            )
            .collect()
    }

    /// Hash secrets and build client records; records are validated later by the registry
    pub fn client_records(&self) -> Result<Vec<ClientRecord>, ClientConfigError> {
        self.clients.iter().map(ClientDocument::to_record).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeDocument {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_claims: Vec<String>,
    #[serde(default = "default_true")]
    pub show_in_discovery_document: bool,
}

impl ScopeDocument {
    fn to_definition(&self, kind: ScopeKind) -> ScopeDefinition {
        ScopeDefinition {
            name: self.name.clone(),
            kind,
            display_name: self
                .display_name
                .clone()
                .unwrap_or_else(|| self.name.clone()),
            description: self.description.clone(),
            user_claims: self.user_claims.clone(),
            show_in_discovery_document: self.show_in_discovery_document,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientDocument {
    pub client_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_uri: Option<String>,
    #[serde(default)]
    pub allowed_grant_types: Vec<GrantType>,
    #[serde(default)]
    pub client_secrets: Vec<SecretDocument>,
    #[serde(default = "default_true")]
    pub require_client_secret: bool,
    #[serde(default)]
    pub require_pkce: bool,
    #[serde(default = "default_true")]
    pub require_consent: bool,
    #[serde(default)]
    pub allow_offline_access: bool,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default)]
    pub front_channel_logout_uri: Option<String>,
    #[serde(default)]
    pub allowed_cors_origins: Vec<String>,
    #[serde(default)]
    pub allowed_scopes: Vec<String>,
}

impl ClientDocument {
    pub fn to_record(&self) -> Result<ClientRecord, ClientConfigError> {
        let secret_digests = self
            .client_secrets
            .iter()
            .map(|secret| secret.to_digest(&self.client_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClientRecord {
            id: self.client_id.clone(),
            display_name: self.client_name.clone(),
            uri: self.client_uri.clone(),
            allowed_grant_types: self.allowed_grant_types.iter().copied().collect(),
            secret_digests,
            require_client_secret: self.require_client_secret,
            require_pkce: self.require_pkce,
            require_consent: self.require_consent,
            allow_offline_access: self.allow_offline_access,
            redirect_uris: self.redirect_uris.iter().cloned().collect(),
            post_logout_redirect_uris: self.post_logout_redirect_uris.iter().cloned().collect(),
            front_channel_logout_uri: self.front_channel_logout_uri.clone(),
            allowed_cors_origins: self.allowed_cors_origins.iter().cloned().collect(),
            allowed_scopes: self.allowed_scopes.iter().cloned().collect(),
        })
    }
}

/// A client secret, either plaintext from secret management or a base64 SHA-256 digest
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDocument {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl SecretDocument {
    fn to_digest(&self, client_id: &str) -> Result<SecretDigest, ClientConfigError> {
        let digest = match (&self.value, &self.sha256) {
            (Some(value), None) => SecretDigest::from_plaintext(value),
            (None, Some(encoded)) => SecretDigest::from_base64(encoded),
            _ => {
                return Err(ClientConfigError::invalid(
                    client_id,
                    "each client secret needs exactly one of 'value' or 'sha256'",
                ));
            }
        }
        .map_err(|e| ClientConfigError::invalid(client_id, e.to_string()))?;

        Ok(digest
            .with_description(self.description.clone())
            .with_expiration(self.expiration))
    }
}

impl fmt::Debug for SecretDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDocument")
            .field("value", &self.value.as_ref().map(|_| "[redacted]"))
            .field("sha256", &self.sha256.as_ref().map(|_| "[redacted]"))
            .field("description", &self.description)
            .field("expiration", &self.expiration)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::secrets;
    use serde_json::json;

    #[test]
    fn test_client_defaults() {
        let document: RegistryDocument = serde_json::from_value(json!({
            "clients": [{
                "client_id": "client",
                "allowed_grant_types": ["client_credentials"],
                "client_secrets": [{ "value": "secret" }],
                "allowed_scopes": ["api1"]
            }]
        }))
        .unwrap();

        let records = document.client_records().unwrap();
        let record = &records[0];
        assert!(record.require_client_secret);
        assert!(record.require_consent);
        assert!(!record.require_pkce);
        assert!(!record.allow_offline_access);
        assert!(record.allows_grant(GrantType::ClientCredentials));
        assert!(secrets::verify("secret", &record.secret_digests));
    }

    #[test]
    fn test_scope_kinds_follow_section() {
        let document: RegistryDocument = serde_json::from_value(json!({
            "identity_resources": [{ "name": "openid", "user_claims": ["sub"] }],
            "api_resources": [{ "name": "api1", "display_name": "My API #1" }]
        }))
        .unwrap();

        let definitions = document.scope_definitions();
        assert_eq!(definitions[0].kind, ScopeKind::Identity);
        assert_eq!(definitions[0].display_name, "openid");
        assert_eq!(definitions[1].kind, ScopeKind::Api);
        assert_eq!(definitions[1].display_name, "My API #1");
    }

    #[test]
    fn test_prehashed_secret() {
        let document: RegistryDocument = serde_json::from_value(json!({
            "clients": [{
                "client_id": "client",
                "allowed_grant_types": ["client_credentials"],
                "client_secrets": [{ "sha256": "fU7fRb+g6YdlniuSqviOLWNkda1M/MuPtH6zNI9inF8=" }]
            }]
        }))
        .unwrap();

        let records = document.client_records().unwrap();
        assert!(secrets::verify(
            "511536EF-F270-4058-80CA-1C89C192F69A",
            &records[0].secret_digests
        ));
    }

    #[test]
    fn test_invalid_secret_documents() {
        for secret in [
            json!({}),
            json!({ "value": "a", "sha256": "fU7fRb+g6YdlniuSqviOLWNkda1M/MuPtH6zNI9inF8=" }),
            json!({ "sha256": "c2hvcnQ=" }),
            json!({ "value": "" }),
        ] {
            let document: RegistryDocument = serde_json::from_value(json!({
                "clients": [{
                    "client_id": "client",
                    "allowed_grant_types": ["client_credentials"],
                    "client_secrets": [secret]
                }]
            }))
            .unwrap();
            let err = document.client_records().unwrap_err();
            assert_eq!(err.client_id(), "client");
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = RegistryDocument::from_json(
            r#"{ "clients": [{ "client_id": "spa", "requirePkce": true }] }"#,
        );
        assert!(matches!(result, Err(LoadError::ParseFailed(_))));

        let result = RegistryDocument::from_json(
            r#"{ "clients": [{ "client_id": "spa", "allowed_grant_types": ["implicit"] }] }"#,
        );
        assert!(matches!(result, Err(LoadError::ParseFailed(_))));
    }

    #[test]
    fn test_secret_document_debug_is_redacted() {
        let secret: SecretDocument =
            serde_json::from_value(json!({ "value": "top-secret" })).unwrap();
        assert!(!format!("{secret:?}").contains("top-secret"));
    }
}
