//! In-memory registry source
//!
//! Serves a document that was built or parsed elsewhere. Suitable for tests and
//! for embedding callers that already hold their configuration.

use crate::storage::document::RegistryDocument;
use crate::storage::traits::{RegistrySource, Result};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryRegistrySource {
    document: Mutex<RegistryDocument>,
}

impl MemoryRegistrySource {
    pub fn new(document: RegistryDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// Replace the document returned by later fetches
    pub fn set_document(&self, document: RegistryDocument) {
        match self.document.lock() {
            Ok(mut current) => *current = document,
            Err(poisoned) => *poisoned.into_inner() = document,
        }
    }
}

#[async_trait]
impl RegistrySource for MemoryRegistrySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn fetch(&self) -> Result<RegistryDocument> {
        let document = match self.document.lock() {
            Ok(document) => document.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Ok(document)
    }
}
