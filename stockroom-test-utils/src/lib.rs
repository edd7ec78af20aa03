//! Stockroom Test Utilities
//!
//! Centralized test infrastructure for the Stockroom workspace:
//! - Proptest generators for item fields and registrations
//! - Instrumented stores and cache backends
//! - Test fixtures for common scenarios
//! - Custom assertions for Stockroom errors

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

// Re-export core types for convenience
pub use stockroom_core::{
    CacheError, Item, ItemFields, ItemId, NewUser, RegisterFields, StockroomError,
    StockroomResult, StorageError, User, UserId, ValidationError,
};
pub use stockroom_storage::{
    CacheBackend, CacheKey, CacheStats, InMemoryItemStore, InMemoryUserStore, ItemStore,
    MemoryCacheBackend, UserStore,
};

// ============================================================================
// INSTRUMENTED STORES AND BACKENDS
// ============================================================================

/// Item store that counts every call before delegating to an in-memory store.
///
/// Lets router tests prove a request never reached the service layer.
#[derive(Debug, Default)]
pub struct CountingItemStore {
    inner: InMemoryItemStore,
    calls: AtomicU64,
    gets: AtomicU64,
}

impl CountingItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total calls across every operation, `ping` excluded.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls to `get` only.
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryItemStore {
        &self.inner
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ItemStore for CountingItemStore {
    async fn insert(&self, fields: ItemFields) -> Result<Item, StorageError> {
        self.touch();
        self.inner.insert(fields).await
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StorageError> {
        self.touch();
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn replace(&self, id: ItemId, fields: ItemFields) -> Result<Item, StorageError> {
        self.touch();
        self.inner.replace(id, fields).await
    }

    async fn delete(&self, id: ItemId) -> Result<(), StorageError> {
        self.touch();
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<Item>, StorageError> {
        self.touch();
        self.inner.list().await
    }
}

/// Cache backend that can be switched into an outage.
///
/// While down, every call fails with `CacheError::Unavailable`.
#[derive(Debug, Default)]
pub struct FlakyCacheBackend {
    inner: MemoryCacheBackend,
    down: AtomicBool,
    failures: AtomicU64,
}

impl FlakyCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that starts out unavailable.
    pub fn down() -> Self {
        let backend = Self::default();
        backend.set_down(true);
        backend
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of calls rejected while down.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Entries currently held by the healthy inner backend.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.down.load(Ordering::SeqCst) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(CacheError::Unavailable {
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.inner.stats();
        stats.errors += self.failures();
        stats
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Stockroom inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid item name (non-blank, within the column width).
    pub fn arb_item_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 _-]{0,40}".prop_map(|s| s.trim_end().to_string())
    }

    /// Generate valid item fields.
    pub fn arb_item_fields() -> impl Strategy<Value = ItemFields> {
        (
            arb_item_name(),
            "[a-z ]{0,60}",
            0i64..10_000,
            0i64..1_000_000,
        )
            .prop_map(|(name, description, quantity, price)| ItemFields {
                name,
                description,
                quantity,
                price,
            })
    }

    /// Generate fields with the given name but arbitrary other values.
    pub fn arb_item_fields_named(name: String) -> impl Strategy<Value = ItemFields> {
        arb_item_fields().prop_map(move |fields| ItemFields {
            name: name.clone(),
            ..fields
        })
    }

    /// Generate between 1 and `max` field sets with pairwise distinct names.
    pub fn arb_distinct_item_fields(max: usize) -> impl Strategy<Value = Vec<ItemFields>> {
        prop::collection::btree_map(arb_item_name(), arb_item_fields(), 1..=max.max(1))
            .prop_map(|by_name| {
                by_name
                    .into_iter()
                    .map(|(name, fields)| ItemFields { name, ..fields })
                    .collect()
            })
    }

    /// Generate item fields that fail validation.
    pub fn arb_invalid_item_fields() -> impl Strategy<Value = ItemFields> {
        prop_oneof![
            "[ ]{0,5}".prop_map(ItemFields::new),
            (arb_item_name(), i64::MIN..0).prop_map(|(n, q)| ItemFields::new(n).with_quantity(q)),
            (arb_item_name(), i64::MIN..0).prop_map(|(n, p)| ItemFields::new(n).with_price(p)),
        ]
    }

    /// Generate a valid registration.
    pub fn arb_register_fields() -> impl Strategy<Value = RegisterFields> {
        ("[a-z][a-z0-9_]{2,20}", "[A-Za-z0-9]{8,24}").prop_map(|(username, password)| {
            RegisterFields {
                email: format!("{}@example.com", username),
                username,
                password2: password.clone(),
                password,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            }
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    pub const TEST_USERNAME: &str = "testuser";
    pub const TEST_PASSWORD: &str = "password123";

    /// The item used by the end-to-end inventory scenario.
    pub fn sample_item_fields() -> ItemFields {
        ItemFields::new("Sample Item")
            .with_description("This is a sample item.")
            .with_quantity(5)
            .with_price(9999)
    }

    pub fn item_fields(name: &str) -> ItemFields {
        ItemFields::new(name).with_quantity(1).with_price(100)
    }

    /// Registration payload for the standard test user.
    pub fn test_user_registration() -> RegisterFields {
        RegisterFields {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
            password2: TEST_PASSWORD.to_string(),
            email: "testuser@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    /// A user with a placeholder hash, for stores that never verify passwords.
    pub fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$placeholder".to_string(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Stockroom results.

    use super::*;

    /// Assert that a result is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &StockroomResult<T>) {
        match result {
            Err(StockroomError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    /// Assert that a result is a Conflict storage error.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &StockroomResult<T>) {
        match result {
            Err(StockroomError::Storage(StorageError::Conflict { .. })) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    /// Assert that a result is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &StockroomResult<T>) {
        match result {
            Err(StockroomError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that an item carries exactly the given mutable fields.
    #[track_caller]
    pub fn assert_item_matches(item: &Item, fields: &ItemFields) {
        assert_eq!(&item.fields(), fields, "item {} does not match fields", item.id);
    }
}

// ============================================================================
// TESTS
// ============================================================================
