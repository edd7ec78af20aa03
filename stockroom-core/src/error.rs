//! Error types for Stockroom operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: &'static str, reason: String },

    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    #[error("Storage connection pool exhausted")]
    PoolExhausted,
}

impl StorageError {
    pub fn item_not_found(id: impl ToString) -> Self {
        StorageError::NotFound {
            entity: "Item",
            id: id.to_string(),
        }
    }

    pub fn duplicate_item_name(name: &str) -> Self {
        StorageError::Conflict {
            entity: "Item",
            reason: format!("an item named '{}' already exists", name),
        }
    }

    pub fn duplicate_username(username: &str) -> Self {
        StorageError::Conflict {
            entity: "User",
            reason: format!("username '{}' is already taken", username),
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

impl ValidationError {
    /// Name of the offending field or constraint.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredFieldMissing { field } => field,
            ValidationError::InvalidValue { field, .. } => field,
            ValidationError::ConstraintViolation { constraint, .. } => constraint,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache entry serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Master error type for all Stockroom errors.
#[derive(Debug, Clone, Error)]
pub enum StockroomError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl StockroomError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StockroomError::Storage(StorageError::NotFound { .. }))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StockroomError::Storage(StorageError::Conflict { .. }))
    }
}

/// Result type alias for Stockroom operations.
pub type StockroomResult<T> = Result<T, StockroomError>;

// =============================================================================
// TESTS
// =============================================================================
