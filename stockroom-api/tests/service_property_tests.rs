//! Property-Based Tests for the Item Service Cache Contract
//!
//! - **Create-then-get**: a fresh item reads back with exactly its fields.
//! - **Unique names**: a duplicate create fails with `Conflict` and leaves
//!   the existing record alone.
//! - **No stale reads after update**: the read following an update returns
//!   the new fields even when the old ones were cached.
//! - **Delete is final**: every read after a delete is `NotFound`.

use std::sync::Arc;

use proptest::prelude::*;
use stockroom_api::auth::{AuthContext, AuthMethod};
use stockroom_api::service::{ItemOperations, ItemService, LoggedItemService};
use stockroom_core::{ItemFields, UserId};
use stockroom_storage::{
    CacheBackend, CacheConfig, CacheFailurePolicy, ItemStore, MemoryCacheBackend,
};
use stockroom_test_utils::assertions::{
    assert_conflict, assert_item_matches, assert_not_found, assert_validation_error,
};
use stockroom_test_utils::generators::{
    arb_distinct_item_fields, arb_invalid_item_fields, arb_item_fields, arb_item_fields_named,
};
use stockroom_test_utils::{CountingItemStore, FlakyCacheBackend};

fn actor() -> AuthContext {
    AuthContext::new(UserId(1), "tester", AuthMethod::Jwt)
}

fn service_over(store: Arc<CountingItemStore>, cache: Arc<dyn CacheBackend>) -> impl ItemOperations {
    LoggedItemService::new(ItemService::new(store, cache, CacheConfig::default()))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_create_then_get_returns_fields(batch in arb_distinct_item_fields(8)) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store, Arc::new(MemoryCacheBackend::new()));
            let actor = actor();

            for fields in batch {
                let created = service.create(&actor, fields.clone()).await.expect("create");
                assert_item_matches(&created, &fields);

                let read = service.get(&actor, created.id).await.expect("get");
                assert!(read.was_cache_miss());
                assert_item_matches(read.value(), &fields);
                assert_eq!(read.value().created_at, created.created_at);
            }
        });
    }

    #[test]
    fn prop_duplicate_name_conflicts(
        (original, duplicate) in arb_item_fields()
            .prop_flat_map(|f| (Just(f.clone()), arb_item_fields_named(f.name)))
    ) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store, Arc::new(MemoryCacheBackend::new()));
            let actor = actor();

            let created = service.create(&actor, original.clone()).await.expect("create");
            assert_conflict(&service.create(&actor, duplicate).await);

            let all = service.list(&actor).await.expect("list");
            assert_eq!(all.len(), 1);
            assert_item_matches(&all[0], &original);
            assert_eq!(all[0].id, created.id);
        });
    }

    #[test]
    fn prop_padded_name_is_same_name(
        fields in arb_item_fields(),
        left in "[ \t]{0,3}",
        right in "[ \t]{1,3}",
    ) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store, Arc::new(MemoryCacheBackend::new()));
            let actor = actor();

            let created = service.create(&actor, fields.clone()).await.expect("create");
            let padded = ItemFields {
                name: format!("{}{}{}", left, fields.name, right),
                ..fields.clone()
            };
            assert_conflict(&service.create(&actor, padded.clone()).await);

            // Updating an item to its own padded name keeps the trimmed form.
            let updated = service.update(&actor, created.id, padded).await.expect("update");
            assert_eq!(updated.name, fields.name);
        });
    }

    #[test]
    fn prop_update_never_serves_stale_cache(
        before in arb_item_fields(),
        after in arb_item_fields(),
    ) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store, Arc::new(MemoryCacheBackend::new()));
            let actor = actor();

            let item = service.create(&actor, before.clone()).await.expect("create");
            // Warm the cache with the old fields.
            service.get(&actor, item.id).await.expect("first get");
            assert!(service.get(&actor, item.id).await.expect("second get").was_cache_hit());

            let updated = service.update(&actor, item.id, after.clone()).await.expect("update");
            assert_item_matches(&updated, &after);
            assert!(updated.updated_at >= item.updated_at);
            assert_eq!(updated.created_at, item.created_at);

            let read = service.get(&actor, item.id).await.expect("get after update");
            assert!(read.was_cache_miss());
            assert_item_matches(read.value(), &after);
        });
    }

    #[test]
    fn prop_delete_is_final(fields in arb_item_fields(), reads in 1usize..5) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store, Arc::new(MemoryCacheBackend::new()));
            let actor = actor();

            let item = service.create(&actor, fields).await.expect("create");
            service.get(&actor, item.id).await.expect("warm cache");
            service.delete(&actor, item.id).await.expect("delete");

            for _ in 0..reads {
                assert_not_found(&service.get(&actor, item.id).await);
            }
            assert_not_found(&service.delete(&actor, item.id).await);
        });
    }

    #[test]
    fn prop_invalid_fields_never_reach_store(fields in arb_invalid_item_fields()) {
        runtime().block_on(async {
            let store = Arc::new(CountingItemStore::new());
            let service = service_over(store.clone(), Arc::new(MemoryCacheBackend::new()));

            assert_validation_error(&service.create(&actor(), fields).await);
            assert_eq!(store.calls(), 0);
        });
    }
}

// ============================================================================
// CACHE OUTAGES
// ============================================================================

#[tokio::test]
async fn test_cache_outage_degrades_to_store() {
    let store = Arc::new(CountingItemStore::new());
    let cache = Arc::new(FlakyCacheBackend::down());
    let service = service_over(store.clone(), cache.clone());
    let actor = actor();

    let item = service
        .create(&actor, ItemFields::new("Flange").with_quantity(2))
        .await
        .expect("create");

    let first = service.get(&actor, item.id).await.expect("read while cache down");
    let second = service.get(&actor, item.id).await.expect("read while cache down");
    assert!(first.was_cache_miss() && second.was_cache_miss());
    assert_eq!(store.gets(), 2);

    // Writes still succeed when invalidation cannot reach the cache.
    service
        .update(&actor, item.id, ItemFields::new("Flange").with_quantity(3))
        .await
        .expect("update while cache down");

    cache.set_down(false);
    let read = service.get(&actor, item.id).await.expect("read after recovery");
    assert_eq!(read.value().quantity, 3);
    assert!(service.get(&actor, item.id).await.expect("cached").was_cache_hit());
    assert!(cache.failures() > 0);
}

#[tokio::test]
async fn test_cache_outage_fails_under_strict_policy() {
    let store = Arc::new(CountingItemStore::new());
    let service = ItemService::new(
        store.clone(),
        Arc::new(FlakyCacheBackend::down()),
        CacheConfig::default().with_failure_policy(CacheFailurePolicy::Fail),
    );
    let actor = actor();

    let item = service
        .create(&actor, ItemFields::new("Gasket"))
        .await
        .expect("create does not touch the cache");
    assert!(service.get(&actor, item.id).await.is_err());
}

#[tokio::test]
async fn test_strict_policy_errors_after_store_write_commits() {
    let store = Arc::new(CountingItemStore::new());
    let service = ItemService::new(
        store.clone(),
        Arc::new(FlakyCacheBackend::down()),
        CacheConfig::default().with_failure_policy(CacheFailurePolicy::Fail),
    );
    let actor = actor();
    let item = service
        .create(&actor, ItemFields::new("Spacer").with_quantity(1))
        .await
        .expect("create");

    assert!(service
        .update(&actor, item.id, ItemFields::new("Spacer").with_quantity(9))
        .await
        .is_err());
    let stored = store.get(item.id).await.expect("store read").expect("row exists");
    assert_eq!(stored.quantity, 9);

    assert!(service.delete(&actor, item.id).await.is_err());
    assert!(store.get(item.id).await.expect("store read").is_none());
}
