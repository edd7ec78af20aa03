//! Inventory item types and field validation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of an item name, matching the `items.name` column width.
pub const MAX_ITEM_NAME_LEN: usize = 255;

/// Store-assigned item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    pub fn new(value: i64) -> Self {
        ItemId(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(ItemId)
    }
}

impl From<i64> for ItemId {
    fn from(value: i64) -> Self {
        ItemId(value)
    }
}

/// The mutable field set of an item.
///
/// Used both for creation and for full-replacement updates. Optional fields
/// fall back to their defaults when absent from a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i64,
    /// Price in minor currency units.
    #[serde(default)]
    pub price: i64,
}

impl ItemFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            quantity: 0,
            price: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    /// Strip surrounding whitespace from the name.
    ///
    /// Names are compared for uniqueness in this form, so `"Bolt"` and
    /// `"  Bolt  "` are the same item name.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.name.trim();
        if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }
        self
    }

    /// Check field constraints before the fields reach a store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        if self.name.chars().count() > MAX_ITEM_NAME_LEN {
            return Err(ValidationError::InvalidValue {
                field: "name".to_string(),
                reason: format!("must be at most {} characters", MAX_ITEM_NAME_LEN),
            });
        }
        if self.quantity < 0 {
            return Err(ValidationError::InvalidValue {
                field: "quantity".to_string(),
                reason: "must be a non-negative integer".to_string(),
            });
        }
        if self.price < 0 {
            return Err(ValidationError::InvalidValue {
                field: "price".to_string(),
                reason: "must be a non-negative integer".to_string(),
            });
        }
        Ok(())
    }
}

/// A persisted inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Build a fresh item from validated fields.
    pub fn from_fields(id: ItemId, fields: ItemFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            description: fields.description,
            quantity: fields.quantity,
            price: fields.price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every mutable field. `created_at` is left untouched.
    pub fn apply(&mut self, fields: ItemFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.description = fields.description;
        self.quantity = fields.quantity;
        self.price = fields.price;
        self.updated_at = now;
    }

    pub fn fields(&self) -> ItemFields {
        ItemFields {
            name: self.name.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
            price: self.price,
        }
    }
}
