//! Async storage traits for the authoritative item and user stores.
//!
//! The persistence store is the single source of truth. Implementations
//! enforce name uniqueness and report absent rows as `StorageError::NotFound`.

use async_trait::async_trait;
use stockroom_core::{Item, ItemFields, ItemId, NewUser, StorageError, User, UserId};

/// Async item persistence.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert a new item, assigning its id and timestamps.
    ///
    /// Fails with `StorageError::Conflict` when the name is taken.
    async fn insert(&self, fields: ItemFields) -> Result<Item, StorageError>;

    /// Get an item by id.
    async fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError>;

    /// Replace every mutable field of an existing item.
    ///
    /// Preserves `created_at` and refreshes `updated_at`.
    async fn replace(&self, id: ItemId, fields: ItemFields) -> Result<Item, StorageError>;

    /// Permanently remove an item.
    async fn delete(&self, id: ItemId) -> Result<(), StorageError>;

    /// All items ordered by id.
    async fn list(&self) -> Result<Vec<Item>, StorageError>;

    /// Cheap liveness probe used by readiness checks.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Async user account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `StorageError::Conflict` on a taken username.
    async fn insert(&self, user: NewUser) -> Result<User, StorageError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError>;
}
