//! In-memory store implementations.
//!
//! Back the `memory` store mode and every unit test that needs a store
//! without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use stockroom_core::{Item, ItemFields, ItemId, NewUser, StorageError, User, UserId};
use tokio::sync::RwLock;

use crate::store::{ItemStore, UserStore};

// ============================================================================
// ITEMS
// ============================================================================

/// Item store held in process memory.
#[derive(Debug, Clone)]
pub struct InMemoryItemStore {
    items: Arc<RwLock<BTreeMap<ItemId, Item>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self {
            items: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Clear all stored data.
    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

fn name_taken(items: &BTreeMap<ItemId, Item>, name: &str, except: Option<ItemId>) -> bool {
    items
        .values()
        .any(|item| item.name == name && Some(item.id) != except)
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn insert(&self, fields: ItemFields) -> Result<Item, StorageError> {
        let mut items = self.items.write().await;
        if name_taken(&items, &fields.name, None) {
            return Err(StorageError::duplicate_item_name(&fields.name));
        }
        let id = ItemId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let item = Item::from_fields(id, fields, Utc::now());
        items.insert(id, item.clone());
        Ok(item)
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn replace(&self, id: ItemId, fields: ItemFields) -> Result<Item, StorageError> {
        let mut items = self.items.write().await;
        if !items.contains_key(&id) {
            return Err(StorageError::item_not_found(id));
        }
        if name_taken(&items, &fields.name, Some(id)) {
            return Err(StorageError::duplicate_item_name(&fields.name));
        }
        let item = items
            .get_mut(&id)
            .ok_or_else(|| StorageError::item_not_found(id))?;
        item.apply(fields, Utc::now());
        Ok(item.clone())
    }

    async fn delete(&self, id: ItemId) -> Result<(), StorageError> {
        match self.items.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::item_not_found(id)),
        }
    }

    async fn list(&self) -> Result<Vec<Item>, StorageError> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

// ============================================================================
// USERS
// ============================================================================

/// User store held in process memory.
#[derive(Debug, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<BTreeMap<UserId, User>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self {
            users: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StorageError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::duplicate_username(&user.username));
        }
        let id = UserId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            date_joined: Utc::now(),
        };
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() -> Result<(), StorageError> {
        let store = InMemoryItemStore::new();
        let a = store.insert(ItemFields::new("A")).await?;
        let b = store.insert(ItemFields::new("B")).await?;
        assert_eq!(a.id, ItemId(1));
        assert_eq!(b.id, ItemId(2));
        assert_eq!(a.created_at, a.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_and_keeps_original() -> Result<(), StorageError> {
        let store = InMemoryItemStore::new();
        let original = store
            .insert(ItemFields::new("Sample Item").with_quantity(5))
            .await?;

        let err = store
            .insert(ItemFields::new("Sample Item").with_quantity(99))
            .await;
        assert!(matches!(err, Err(StorageError::Conflict { .. })));

        let stored = store.get(original.id).await?;
        assert_eq!(stored, Some(original));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_refreshes_updated_at_only() -> Result<(), StorageError> {
        let store = InMemoryItemStore::new();
        let item = store.insert(ItemFields::new("Widget")).await?;
        let replaced = store
            .replace(item.id, ItemFields::new("Widget").with_quantity(7))
            .await?;
        assert_eq!(replaced.created_at, item.created_at);
        assert!(replaced.updated_at >= item.updated_at);
        assert_eq!(replaced.quantity, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_into_taken_name_conflicts() -> Result<(), StorageError> {
        let store = InMemoryItemStore::new();
        store.insert(ItemFields::new("A")).await?;
        let b = store.insert(ItemFields::new("B")).await?;
        let err = store.replace(b.id, ItemFields::new("A")).await;
        assert!(matches!(err, Err(StorageError::Conflict { .. })));

        // Keeping its own name is fine.
        assert!(store.replace(b.id, ItemFields::new("B")).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_item_errors() {
        let store = InMemoryItemStore::new();
        assert!(matches!(
            store.replace(ItemId(9), ItemFields::new("x")).await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(ItemId(9)).await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() -> Result<(), StorageError> {
        let store = InMemoryItemStore::new();
        for name in ["c", "a", "b"] {
            store.insert(ItemFields::new(name)).await?;
        }
        let ids: Vec<i64> = store.list().await?.iter().map(|i| i.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_store_rejects_duplicate_username() -> Result<(), StorageError> {
        let store = InMemoryUserStore::new();
        let new_user = NewUser {
            username: "testuser".to_string(),
            email: "testuser@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "hash".to_string(),
        };
        let user = store.insert(new_user.clone()).await?;
        assert!(matches!(
            store.insert(new_user).await,
            Err(StorageError::Conflict { .. })
        ));
        assert_eq!(store.find_by_username("testuser").await?, Some(user.clone()));
        assert_eq!(store.get(user.id).await?, Some(user));
        Ok(())
    }
}
