use crate::core::errors::Result;

/// Names of the persisted slots.
pub mod slots {
    pub const PRIVATE_KEY: &str = "private-key";
    pub const PUBLIC_KEY: &str = "public-key";
    pub const RECIPIENT_KEYS: &str = "recipient-public-keys";
    pub const FINGERPRINTS: &str = "public-key-fingerprints";
    pub const HIDDEN_KEYS: &str = "hidden-keys";
}

/// Port for the string-keyed persisted store.
///
/// A `put` must be durable before it returns. A missing name reads as
/// `Ok(None)`, never as an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>>;

    fn put(&self, name: &str, value: &str) -> Result<()>;

    /// Delete `name`. Deleting a missing name succeeds.
    fn remove(&self, name: &str) -> Result<()>;
}
