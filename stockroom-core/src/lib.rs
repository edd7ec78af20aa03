//! Stockroom Core - Domain Types
//!
//! Pure data structures and field validation. All other crates depend on this.
//! This crate performs no I/O.

pub mod error;
pub mod item;
pub mod user;

pub use error::{CacheError, ConfigError, StockroomError, StockroomResult, StorageError, ValidationError};
pub use item::{Item, ItemFields, ItemId, MAX_ITEM_NAME_LEN};
pub use user::{NewUser, RegisterFields, User, UserId, MAX_USERNAME_LEN, MIN_PASSWORD_LEN};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
