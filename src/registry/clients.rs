//! Immutable client registry with load-time invariant checks.

use crate::errors::{ClientConfigError, LookupError};
use crate::registry::scopes::ScopeCatalog;
use crate::registry::secrets::SecretDigest;
use crate::registry::types::{ClientSummary, GrantType, OFFLINE_ACCESS};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// A registered OAuth client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// Unique, case-sensitive client identifier
    pub id: String,
    pub display_name: Option<String>,
    pub uri: Option<String>,
    /// Grant types this client may use
    pub allowed_grant_types: BTreeSet<GrantType>,
    /// Secret hashes, any of which may match
    pub secret_digests: Vec<SecretDigest>,
    pub require_client_secret: bool,
    pub require_pkce: bool,
    pub require_consent: bool,
    /// Permits the `offline_access` scope
    pub allow_offline_access: bool,
    /// Exact-match redirect URIs for interactive grants
    pub redirect_uris: BTreeSet<String>,
    pub post_logout_redirect_uris: BTreeSet<String>,
    pub front_channel_logout_uri: Option<String>,
    /// Exact-match browser origins
    pub allowed_cors_origins: BTreeSet<String>,
    pub allowed_scopes: BTreeSet<String>,
}

impl ClientRecord {
    /// A confidential client with no grants, secrets or scopes yet
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            uri: None,
            allowed_grant_types: BTreeSet::new(),
            secret_digests: Vec::new(),
            require_client_secret: true,
            require_pkce: false,
            require_consent: true,
            allow_offline_access: false,
            redirect_uris: BTreeSet::new(),
            post_logout_redirect_uris: BTreeSet::new(),
            front_channel_logout_uri: None,
            allowed_cors_origins: BTreeSet::new(),
            allowed_scopes: BTreeSet::new(),
        }
    }

    pub fn is_public(&self) -> bool {
        !self.require_client_secret
    }

    pub fn allows_grant(&self, grant_type: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant_type)
    }

    pub fn summary(&self) -> ClientSummary {
        ClientSummary {
            client_id: self.id.clone(),
            display_name: self.display_name.clone(),
            uri: self.uri.clone(),
            front_channel_logout_uri: self.front_channel_logout_uri.clone(),
        }
    }

    /// Check the record against itself and the scope catalog
    pub fn validate(&self, catalog: &ScopeCatalog) -> Result<(), ClientConfigError> {
        let invalid = |reason: String| ClientConfigError::invalid(&self.id, reason);

        if self.id.trim().is_empty() {
            return Err(invalid("client id must not be empty".to_string()));
        }

        if self.allowed_grant_types.is_empty() {
            return Err(invalid("allowed_grant_types must not be empty".to_string()));
        }

        if self.allows_grant(GrantType::AuthorizationCode) && self.allows_grant(GrantType::Hybrid) {
            return Err(invalid(
                "allowed_grant_types cannot contain both authorization_code and hybrid"
                    .to_string(),
            ));
        }

        if self.require_client_secret && self.secret_digests.is_empty() {
            return Err(invalid(
                "a client that requires a secret must have at least one secret".to_string(),
            ));
        }

        if !self.require_client_secret && !self.secret_digests.is_empty() {
            return Err(invalid("a public client must not carry secrets".to_string()));
        }

        let interactive = self.allowed_grant_types.iter().any(|g| g.is_interactive());

        if self.require_pkce {
            if self.require_client_secret {
                return Err(invalid(
                    "require_pkce and require_client_secret cannot both be set".to_string(),
                ));
            }
            if !interactive {
                return Err(invalid(
                    "require_pkce needs the authorization_code or hybrid grant type".to_string(),
                ));
            }
        }

        if interactive && self.redirect_uris.is_empty() {
            return Err(invalid(
                "redirect_uris must not be empty for interactive grant types".to_string(),
            ));
        }

        for uri in self
            .redirect_uris
            .iter()
            .chain(self.post_logout_redirect_uris.iter())
            .chain(self.front_channel_logout_uri.iter())
        {
            validate_absolute_uri(uri).map_err(&invalid)?;
        }

        for origin in &self.allowed_cors_origins {
            validate_origin(origin).map_err(&invalid)?;
        }

        if let Some(unknown) = self
            .allowed_scopes
            .iter()
            .find(|scope| scope.as_str() != OFFLINE_ACCESS && !catalog.is_known(scope))
        {
            return Err(invalid(format!("allowed scope '{unknown}' is not registered")));
        }

        Ok(())
    }
}

fn validate_absolute_uri(uri: &str) -> Result<(), String> {
    let parsed = Url::parse(uri).map_err(|e| format!("invalid URI '{uri}': {e}"))?;
    if parsed.cannot_be_a_base() {
        return Err(format!("URI '{uri}' must be hierarchical"));
    }
    Ok(())
}

fn validate_origin(origin: &str) -> Result<(), String> {
    let parsed = Url::parse(origin).map_err(|e| format!("invalid origin '{origin}': {e}"))?;
    let canonical = parsed.origin().ascii_serialization();
    if canonical != origin {
        return Err(format!(
            "origin '{origin}' must be scheme://host[:port] without path, expected '{canonical}'"
        ));
    }
    Ok(())
}

/// Read-only set of client records keyed by client id
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, ClientRecord>,
}

impl ClientRegistry {
    /// Validate every record and build the registry; any failure aborts the load
    pub fn register(
        records: impl IntoIterator<Item = ClientRecord>,
        catalog: &ScopeCatalog,
    ) -> Result<Self, ClientConfigError> {
        let mut clients = BTreeMap::new();
        for record in records {
            record.validate(catalog)?;
            if clients.contains_key(&record.id) {
                return Err(ClientConfigError::invalid(
                    &record.id,
                    "duplicate client id",
                ));
            }
            clients.insert(record.id.clone(), record);
        }
        Ok(Self { clients })
    }

    pub fn lookup(&self, client_id: &str) -> Result<&ClientRecord, LookupError> {
        self.clients
            .get(client_id)
            .ok_or_else(|| LookupError::NotFound(client_id.to_string()))
    }

    /// Public-facing fields only; secrets are never exposed
    pub fn public_info(&self, client_id: &str) -> Result<ClientSummary, LookupError> {
        self.lookup(client_id).map(ClientRecord::summary)
    }

    pub fn client_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
