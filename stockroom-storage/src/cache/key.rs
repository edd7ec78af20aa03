//! Cache key construction.
//!
//! Keys take the form `{entity_type}_{id}`, so item 7 lives under `item_7`.
//! A key can only be built from a cacheable type and its id, which keeps every
//! writer and invalidator agreeing on the same string.

use std::fmt;

use super::traits::CacheableEntity;

/// A cache key for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for entity `T` with the given id.
    pub fn for_entity<T: CacheableEntity>(id: T::Id) -> Self {
        CacheKey(format!("{}_{}", T::entity_type(), id))
    }

    /// Apply a namespace prefix, as used by shared network caches.
    pub fn prefixed(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.0.clone()
        } else {
            format!("{}:{}", prefix, self.0)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{Item, ItemId};

    #[test]
    fn test_item_key_format() {
        let key = CacheKey::for_entity::<Item>(ItemId(42));
        assert_eq!(key.as_str(), "item_42");
        assert_eq!(key.to_string(), "item_42");
    }

    #[test]
    fn test_prefixed_key() {
        let key = CacheKey::for_entity::<Item>(ItemId(3));
        assert_eq!(key.prefixed("stockroom"), "stockroom:item_3");
        assert_eq!(key.prefixed(""), "item_3");
    }
}
