//! Key inventory
//!
//! Read-only access to the key material the gateway hands out. The
//! inventory owns nothing: keys are opaque blobs managed out of band, and
//! the gateway only ever lists and reads them.

pub mod dir;
pub mod memory;

pub use dir::DirKeyStore;
pub use memory::MemoryKeyStore;

use crate::errors::Result;

/// Read-only view over the key material addressed by identity name.
pub trait KeyInventory: Send + Sync {
    /// All identity names with key material, hidden entries filtered out.
    fn list_identities(&self) -> Result<Vec<String>>;

    /// Whether key material exists for this identity.
    fn contains(&self, cn: &str) -> Result<bool>;

    /// The key bytes for an identity; `KeyNotFound` if absent.
    fn read_key(&self, cn: &str) -> Result<Vec<u8>>;
}
