//! Registry document sources with file and in-memory backends.

pub mod document;
pub mod file;
pub mod inmemory;
pub mod traits;

pub use document::{ClientDocument, RegistryDocument, ScopeDocument, SecretDocument};
pub use file::FileRegistrySource;
pub use inmemory::MemoryRegistrySource;
pub use traits::RegistrySource;
