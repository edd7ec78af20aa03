//! Password hashing for user accounts.
//!
//! Argon2id with default parameters and a random salt per hash, stored as a
//! PHC string. Hashing is CPU-bound, so the async wrappers move it onto the
//! blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{ApiError, ApiResult};

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_async(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::internal_error(format!("Password hashing failed: {}", e)))
}

/// [`verify_password`] on the blocking pool. A malformed stored hash counts
/// as a mismatch and is logged.
pub async fn verify_password_async(password: String, hash: String) -> ApiResult<bool> {
    let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal_error(format!("Password check task failed: {}", e)))?;

    match outcome {
        Ok(matched) => Ok(matched),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is malformed");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() -> Result<(), argon2::password_hash::Error> {
        let hash = hash_password("newpassword123")?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("newpassword123", &hash)?);
        assert!(!verify_password("wrongpassword", &hash)?);
        Ok(())
    }

    #[test]
    fn test_same_password_different_salts() -> Result<(), argon2::password_hash::Error> {
        let a = hash_password("password123")?;
        let b = hash_password("password123")?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_async_wrappers() -> ApiResult<()> {
        let hash = hash_password_async("password123".to_string()).await?;
        assert!(verify_password_async("password123".to_string(), hash.clone()).await?);
        assert!(!verify_password_async("nope".to_string(), hash).await?);
        assert!(!verify_password_async("x".to_string(), "garbage".to_string()).await?);
        Ok(())
    }
}
