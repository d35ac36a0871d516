//! Storage trait definitions for registry documents.
//!
//! A source only produces documents; validation always happens when the
//! registry snapshot is built, whatever the source.

use crate::errors::LoadError;
use crate::storage::document::RegistryDocument;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Trait for fetching the registry document from configuration or storage
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Human-readable location, used in logs and errors
    fn describe(&self) -> String;

    /// Fetch the current document
    async fn fetch(&self) -> Result<RegistryDocument>;
}
