//! Immutable registry snapshots and the shared reference readers go through.

use crate::errors::{LoadError, LookupError, RegistryError};
use crate::registry::clients::{ClientRecord, ClientRegistry};
use crate::registry::policy::{Decision, PolicyEvaluator, RequestDescriptor};
use crate::registry::scopes::ScopeCatalog;
use crate::registry::types::ClientSummary;
use crate::storage::document::RegistryDocument;
use crate::storage::traits::RegistrySource;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// A fully validated scope catalog and client registry
#[derive(Debug, Clone)]
pub struct Registry {
    scopes: ScopeCatalog,
    clients: ClientRegistry,
    loaded_at: DateTime<Utc>,
}

impl Registry {
    /// Callers must have validated `clients` against `scopes`
    pub(crate) fn new(scopes: ScopeCatalog, clients: ClientRegistry) -> Self {
        Self {
            scopes,
            clients,
            loaded_at: Utc::now(),
        }
    }

    /// Build the catalog, then the clients against it; all-or-nothing
    pub fn load(document: &RegistryDocument) -> Result<Self, LoadError> {
        let scopes = ScopeCatalog::register(document.scope_definitions())?;
        let clients = ClientRegistry::register(document.client_records()?, &scopes)?;

        tracing::info!(
            scopes = scopes.len(),
            clients = clients.len(),
            "registry snapshot built"
        );

        Ok(Self::new(scopes, clients))
    }

    /// Fetch a document from `source` and load it
    pub async fn load_from(source: &dyn RegistrySource) -> Result<Self, LoadError> {
        let document = source.fetch().await?;
        Self::load(&document)
    }

    pub fn scopes(&self) -> &ScopeCatalog {
        &self.scopes
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn evaluator(&self) -> PolicyEvaluator<'_> {
        PolicyEvaluator::new(&self.clients, &self.scopes)
    }

    pub fn evaluate(&self, request: &RequestDescriptor) -> Decision {
        self.evaluator().evaluate(request)
    }

    pub fn lookup(&self, client_id: &str) -> Result<&ClientRecord, LookupError> {
        self.clients.lookup(client_id)
    }

    pub fn public_info(&self, client_id: &str) -> Result<ClientSummary, LookupError> {
        self.clients.public_info(client_id)
    }
}

/// The current snapshot; reloads swap the reference and never mutate in place
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Initial load; an error here must stop startup
    pub async fn from_source(source: &dyn RegistrySource) -> Result<Self, LoadError> {
        Ok(Self::new(Registry::load_from(source).await?))
    }

    pub fn snapshot(&self) -> Result<Arc<Registry>, RegistryError> {
        self.current.read().map(|current| current.clone()).map_err(|e| {
            tracing::error!(error = %e, "registry snapshot lock poisoned");
            RegistryError::LockPoisoned(e.to_string())
        })
    }

    /// Swap in a new snapshot and return the previous one
    pub fn replace(&self, registry: Registry) -> Result<Arc<Registry>, RegistryError> {
        self.install(Arc::new(registry))
    }

    fn install(&self, registry: Arc<Registry>) -> Result<Arc<Registry>, RegistryError> {
        let mut current = self.current.write().map_err(|e| {
            tracing::error!(error = %e, "registry snapshot lock poisoned");
            RegistryError::LockPoisoned(e.to_string())
        })?;
        Ok(std::mem::replace(&mut *current, registry))
    }

    /// Load a fresh snapshot from `source`; on failure the current snapshot stays in service
    pub async fn reload(&self, source: &dyn RegistrySource) -> Result<Arc<Registry>, RegistryError> {
        let registry = match Registry::load_from(source).await {
            Ok(registry) => registry,
            Err(err) => {
                tracing::warn!(source = %source.describe(), error = %err, "registry reload rejected");
                return Err(RegistryError::ReloadRejected(err));
            }
        };

        let installed = Arc::new(registry);
        self.install(installed.clone())?;
        tracing::info!(source = %source.describe(), "registry snapshot swapped");
        Ok(installed)
    }

    /// Evaluate against whichever snapshot is current when the call starts
    pub fn evaluate(&self, request: &RequestDescriptor) -> Result<Decision, RegistryError> {
        Ok(self.snapshot()?.evaluate(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::GrantType;
    use crate::storage::inmemory::MemoryRegistrySource;
    use serde_json::json;

    fn document(scopes: &[&str]) -> RegistryDocument {
        serde_json::from_value(json!({
            "api_resources": [{ "name": "api1" }, { "name": "api2" }],
            "clients": [{
                "client_id": "client",
                "allowed_grant_types": ["client_credentials"],
                "client_secrets": [{ "value": "secret" }],
                "allowed_scopes": scopes
            }]
        }))
        .unwrap()
    }

    fn request(scope: &str) -> RequestDescriptor {
        RequestDescriptor::new("client", GrantType::ClientCredentials)
            .with_secret("secret")
            .with_scopes([scope])
    }

    #[test]
    fn test_load_rejects_partial_registry() {
        let mut broken = document(&["api1"]);
        broken.clients.push(broken.clients[0].clone());
        let result = Registry::load(&broken);
        assert!(matches!(result, Err(LoadError::Clients(_))));
    }

    #[test]
    fn test_load_rejects_duplicate_scopes() {
        let document: RegistryDocument = serde_json::from_value(json!({
            "identity_resources": [{ "name": "openid" }],
            "api_resources": [{ "name": "openid" }]
        }))
        .unwrap();
        assert!(matches!(
            Registry::load(&document),
            Err(LoadError::Scopes(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let source = MemoryRegistrySource::new(document(&["api1"]));
        let shared = SharedRegistry::from_source(&source).await.unwrap();

        let before = shared.snapshot().unwrap();
        assert!(!shared.evaluate(&request("api2")).unwrap().is_allowed());

        source.set_document(document(&["api1", "api2"]));
        shared.reload(&source).await.unwrap();

        assert!(shared.evaluate(&request("api2")).unwrap().is_allowed());
        // Readers holding the old snapshot keep their view.
        assert!(!before.evaluate(&request("api2")).is_allowed());
    }

    #[test]
    fn test_load_rejects_scope_missing_from_catalog() {
        let mut document = document(&["api1"]);
        document.api_resources.clear();
        assert!(matches!(
            Registry::load(&document),
            Err(LoadError::Clients(_))
        ));
    }

    #[tokio::test]
    async fn test_reload_returns_installed_snapshot() {
        let source = MemoryRegistrySource::new(document(&["api1"]));
        let shared = SharedRegistry::from_source(&source).await.unwrap();

        source.set_document(document(&["api1", "api2"]));
        let reloaded = shared.reload(&source).await.unwrap();
        assert!(Arc::ptr_eq(&reloaded, &shared.snapshot().unwrap()));
        assert!(reloaded.evaluate(&request("api2")).is_allowed());

        // A later swap does not change what the earlier reload handed back.
        let replaced = shared
            .replace(Registry::load(&document(&["api1"])).unwrap())
            .unwrap();
        assert!(Arc::ptr_eq(&reloaded, &replaced));
        assert!(reloaded.evaluate(&request("api2")).is_allowed());
        assert!(!shared.evaluate(&request("api2")).unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_current_snapshot() {
        let source = MemoryRegistrySource::new(document(&["api1"]));
        let shared = SharedRegistry::from_source(&source).await.unwrap();
        let before = shared.snapshot().unwrap();

        source.set_document(document(&["api3"]));
        let result = shared.reload(&source).await;
        assert!(matches!(result, Err(RegistryError::ReloadRejected(_))));

        let after = shared.snapshot().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(shared.evaluate(&request("api1")).unwrap().is_allowed());
    }
}
