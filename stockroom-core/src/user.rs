//! User accounts and registration input

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Store-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered account. The password hash never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

/// A user ready for insertion, carrying an already-hashed password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Raw registration input as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterFields {
    pub username: String,
    pub password: String,
    pub password2: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl RegisterFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "username".to_string(),
            });
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(ValidationError::InvalidValue {
                field: "username".to_string(),
                reason: format!("must be at most {} characters", MAX_USERNAME_LEN),
            });
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::InvalidValue {
                field: "password".to_string(),
                reason: format!("must be at least {} characters", MIN_PASSWORD_LEN),
            });
        }
        if self.password != self.password2 {
            return Err(ValidationError::ConstraintViolation {
                constraint: "password2".to_string(),
                reason: "password fields didn't match".to_string(),
            });
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                reason: "enter a valid email address".to_string(),
            });
        }
        Ok(())
    }

    /// Convert into a storable user once the password has been hashed.
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username.trim().to_string(),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RegisterFields {
        RegisterFields {
            username: "newuser".to_string(),
            password: "newpassword123".to_string(),
            password2: "newpassword123".to_string(),
            email: "newuser@example.com".to_string(),
            first_name: "New".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[test]
    fn test_register_fields_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_register_fields_password_mismatch() {
        let mut fields = valid();
        fields.password2 = "different123".to_string();
        let err = fields.validate();
        assert!(matches!(err, Err(ValidationError::ConstraintViolation { .. })));
    }

    #[test]
    fn test_register_fields_short_password() {
        let mut fields = valid();
        fields.password = "short".to_string();
        fields.password2 = "short".to_string();
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_register_fields_email_is_optional_but_checked() {
        let mut fields = valid();
        fields.email = String::new();
        assert!(fields.validate().is_ok());
        fields.email = "not-an-email".to_string();
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() -> Result<(), serde_json::Error> {
        let user = User {
            id: UserId(1),
            username: "alice".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            date_joined: Utc::now(),
        };
        let json = serde_json::to_string(&user)?;
        assert!(!json.contains("argon2"));
        Ok(())
    }
}
